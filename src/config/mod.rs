use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::fs;

use crate::engine::models::{LauncherConfig, non_blank};
use crate::networking::NetworkClient;
use crate::util::strip_bom;

/// Loads `launcher.json`, seeding it on first run and applying a remote override.
#[derive(Clone)]
pub struct ConfigService {
    config_path: PathBuf,
    template_path: PathBuf,
    network: NetworkClient,
}

impl ConfigService {
    pub fn new(config_path: PathBuf, template_path: PathBuf) -> Self {
        Self {
            config_path,
            template_path,
            network: NetworkClient::new(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve the session configuration.
    ///
    /// # Errors
    /// Fails when the local file can be neither created nor read, or holds
    /// malformed JSON. Remote override failures are never returned.
    pub async fn load(&self) -> io::Result<LauncherConfig> {
        self.ensure_config_file().await?;
        let local = read_config(&self.config_path).await?;

        let Some(remote_url) = non_blank(&local.raw_config_url) else {
            return Ok(local);
        };

        match self.fetch_remote(remote_url).await {
            Ok(Some(mut remote)) => {
                info!("config: applied remote override from {remote_url}");
                if non_blank(&remote.raw_config_url).is_none() {
                    remote.raw_config_url = local.raw_config_url.clone();
                }
                Ok(remote)
            }
            Ok(None) => {
                warn!("config: remote override at {remote_url} was empty; using local config");
                Ok(local)
            }
            Err(err) => {
                warn!("config: remote override unavailable ({err}); using local config");
                Ok(local)
            }
        }
    }

    async fn ensure_config_file(&self) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        if fs::try_exists(&self.config_path).await? {
            return Ok(());
        }

        if fs::try_exists(&self.template_path).await? {
            info!(
                "config: seeding {} from {}",
                self.config_path.display(),
                self.template_path.display()
            );
            fs::copy(&self.template_path, &self.config_path).await?;
            return Ok(());
        }

        info!(
            "config: writing empty config to {}",
            self.config_path.display()
        );
        let bytes = serde_json::to_vec_pretty(&LauncherConfig::default())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.config_path, bytes).await
    }

    async fn fetch_remote(&self, url: &str) -> Result<Option<LauncherConfig>, String> {
        debug!("config: fetching remote override from {url}");
        self.network.get_json::<Option<LauncherConfig>>(url).await
    }
}

async fn read_config(path: &Path) -> io::Result<LauncherConfig> {
    let raw = fs::read(path).await?;
    let raw = strip_bom(&raw);
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(LauncherConfig::default());
    }
    let parsed: Option<LauncherConfig> = serde_json::from_slice(raw).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid launcher config {}: {e}", path.display()),
        )
    })?;
    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubResponse, serve, unreachable_url};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConfigService {
        let config_dir = dir.path().join("Config");
        ConfigService::new(
            config_dir.join("launcher.json"),
            config_dir.join("launcher.template.json"),
        )
    }

    async fn write_local(service: &ConfigService, config: &LauncherConfig) {
        let parent = service.config_path().parent().unwrap();
        fs::create_dir_all(parent).await.unwrap();
        fs::write(service.config_path(), serde_json::to_vec(config).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn writes_default_config_when_nothing_exists() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let config = service.load().await.unwrap();

        assert_eq!(config, LauncherConfig::default());
        let written = fs::read_to_string(service.config_path()).await.unwrap();
        assert!(written.contains("\"gameTitle\""));
        assert!(written.contains('\n'));
    }

    #[tokio::test]
    async fn seeds_from_template_verbatim() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let template = "{\n  \"gameTitle\": \"From Template\"\n}\n";
        fs::create_dir_all(dir.path().join("Config")).await.unwrap();
        fs::write(&service.template_path, template).await.unwrap();

        let config = service.load().await.unwrap();

        assert_eq!(config.game_title.as_deref(), Some("From Template"));
        assert_eq!(
            fs::read_to_string(service.config_path()).await.unwrap(),
            template
        );
    }

    #[tokio::test]
    async fn existing_config_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let local = LauncherConfig {
            tagline: Some("local".into()),
            ..Default::default()
        };
        write_local(&service, &local).await;
        fs::write(&service.template_path, r#"{"tagline": "template"}"#)
            .await
            .unwrap();

        assert_eq!(service.load().await.unwrap(), local);
    }

    #[tokio::test]
    async fn empty_or_null_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        fs::create_dir_all(dir.path().join("Config")).await.unwrap();

        fs::write(service.config_path(), "null").await.unwrap();
        assert_eq!(service.load().await.unwrap(), LauncherConfig::default());

        fs::write(service.config_path(), "  \n").await.unwrap();
        assert_eq!(service.load().await.unwrap(), LauncherConfig::default());
    }

    #[tokio::test]
    async fn byte_order_mark_and_pascal_case_keys_are_accepted() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        fs::create_dir_all(dir.path().join("Config")).await.unwrap();
        let mut raw = b"\xEF\xBB\xBF".to_vec();
        raw.extend_from_slice(br#"{"GameTitle": "X", "tagline": "Y"}"#);
        fs::write(service.config_path(), raw).await.unwrap();

        let config = service.load().await.unwrap();
        assert_eq!(config.game_title.as_deref(), Some("X"));
        assert_eq!(config.tagline.as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn malformed_local_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        fs::create_dir_all(dir.path().join("Config")).await.unwrap();
        fs::write(service.config_path(), "{ broken").await.unwrap();

        let err = service.load().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn remote_override_replaces_local_and_keeps_source_url() {
        let server = serve(vec![(
            "/launcher.json",
            StubResponse::json(r#"{"gameTitle": "Remote", "statusEndpoint": "https://status"}"#),
        )])
        .await;
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let remote_url = server.url("/launcher.json");
        let local = LauncherConfig {
            raw_config_url: Some(remote_url.clone()),
            game_title: Some("Local".into()),
            tagline: Some("only local".into()),
            ..Default::default()
        };
        write_local(&service, &local).await;

        let config = service.load().await.unwrap();

        assert_eq!(
            config,
            LauncherConfig {
                raw_config_url: Some(remote_url),
                game_title: Some("Remote".into()),
                status_endpoint: Some("https://status".into()),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn remote_override_may_redirect_future_reloads() {
        let server = serve(vec![(
            "/launcher.json",
            StubResponse::json(r#"{"rawConfigUrl": "https://elsewhere/launcher.json"}"#),
        )])
        .await;
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        write_local(
            &service,
            &LauncherConfig {
                raw_config_url: Some(server.url("/launcher.json")),
                ..Default::default()
            },
        )
        .await;

        let config = service.load().await.unwrap();
        assert_eq!(
            config.raw_config_url.as_deref(),
            Some("https://elsewhere/launcher.json")
        );
    }

    #[tokio::test]
    async fn unreachable_remote_keeps_local_config() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let local = LauncherConfig {
            raw_config_url: Some(unreachable_url("/launcher.json").await),
            game_title: Some("Local".into()),
            ..Default::default()
        };
        write_local(&service, &local).await;

        assert_eq!(service.load().await.unwrap(), local);
    }

    #[tokio::test]
    async fn failing_or_unparseable_remote_keeps_local_config() {
        let server = serve(vec![
            ("/broken.json", StubResponse::json("<html>")),
            ("/null.json", StubResponse::json("null")),
            ("/down.json", StubResponse::status(503)),
        ])
        .await;
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        for path in ["/broken.json", "/null.json", "/down.json"] {
            let local = LauncherConfig {
                raw_config_url: Some(server.url(path)),
                build_version: Some("Build 2".into()),
                ..Default::default()
            };
            write_local(&service, &local).await;
            assert_eq!(service.load().await.unwrap(), local, "{path}");
        }
    }
}
