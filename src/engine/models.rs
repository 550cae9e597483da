use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_GAME_TITLE: &str = "Crystal Shards";
pub const DEFAULT_TAGLINE: &str = "Awaken the ancient power and protect your realm";
pub const DEFAULT_BUILD_VERSION: &str = "Build 1.0.0";

/// Launcher-wide settings as stored in `launcher.json` or served by a remote override.
///
/// Every key is optional; consumers fall back to built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LauncherConfig {
    #[serde(alias = "RawConfigUrl")]
    pub raw_config_url: Option<String>,
    #[serde(alias = "GameTitle")]
    pub game_title: Option<String>,
    #[serde(alias = "Tagline")]
    pub tagline: Option<String>,
    #[serde(alias = "BuildVersion")]
    pub build_version: Option<String>,
    #[serde(alias = "GameExecutable")]
    pub game_executable: Option<String>,
    #[serde(alias = "ClientDirectory")]
    pub client_directory: Option<String>,
    #[serde(alias = "AssetsManifest")]
    pub assets_manifest: Option<String>,
    #[serde(alias = "WebsiteUrl")]
    pub website_url: Option<String>,
    #[serde(alias = "NewsFeed")]
    pub news_feed: Option<String>,
    #[serde(alias = "PatchNotesFeed")]
    pub patch_notes_feed: Option<String>,
    #[serde(alias = "StatusEndpoint")]
    pub status_endpoint: Option<String>,
    #[serde(alias = "DefaultServerState")]
    pub default_server_state: Option<String>,
    #[serde(alias = "DownloadPackageUrl")]
    pub download_package_url: Option<String>,
    #[serde(alias = "DownloadPackageFileName")]
    pub download_package_file_name: Option<String>,
    #[serde(alias = "News")]
    pub news: Option<Vec<NewsEntry>>,
    #[serde(alias = "PatchNotes")]
    pub patch_notes: Option<Vec<PatchNoteEntry>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsEntry {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "Subtitle")]
    pub subtitle: String,
    #[serde(alias = "PublishedAt")]
    pub published_at: String,
    #[serde(alias = "Tag")]
    pub tag: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchNoteEntry {
    #[serde(alias = "Version")]
    pub version: String,
    #[serde(alias = "Summary")]
    pub summary: String,
}

/// One file a correctly installed client must contain.
///
/// Only `local_file` is consulted by existence-only verification; hashes and
/// sizes are informational unless deep verification is requested.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifestEntry {
    #[serde(alias = "Url")]
    pub url: Option<String>,
    #[serde(rename = "localfile", alias = "localFile", alias = "LocalFile")]
    pub local_file: Option<String>,
    #[serde(rename = "packedhash", alias = "packedHash", alias = "PackedHash")]
    pub packed_hash: Option<String>,
    #[serde(rename = "unpackedhash", alias = "unpackedHash", alias = "UnpackedHash")]
    pub unpacked_hash: Option<String>,
    #[serde(
        rename = "packedsize",
        alias = "packedSize",
        alias = "PackedSize",
        deserialize_with = "lenient_size"
    )]
    pub packed_size: Option<i64>,
    #[serde(
        rename = "unpackedsize",
        alias = "unpackedSize",
        alias = "UnpackedSize",
        deserialize_with = "lenient_size"
    )]
    pub unpacked_size: Option<i64>,
}

// Sizes are informational: numbers, numeric strings and null are accepted,
// anything else reads as unknown.
fn lenient_size<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    Online,
    Maintenance,
    Offline,
}

impl ServerState {
    pub fn label(self) -> &'static str {
        match self {
            ServerState::Online => "SERVERS ONLINE",
            ServerState::Maintenance => "UNDER MAINTENANCE",
            ServerState::Offline => "SERVERS OFFLINE",
        }
    }
}

/// Display label for an optional state; "unknown" is never stored.
pub fn server_state_label(state: Option<ServerState>) -> &'static str {
    state.map(ServerState::label).unwrap_or("STATUS UNKNOWN")
}

/// Returns the trimmed value when it holds anything but whitespace.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}

pub fn default_news() -> Vec<NewsEntry> {
    vec![
        news(
            "Eclipse Season",
            "Dynamic events arrive with new challenges",
            "19 NOV 2025",
            "EVENT",
        ),
        news(
            "Battle Pass",
            "Collect exclusive skins and limited rewards",
            "16 NOV 2025",
            "STORE",
        ),
        news(
            "Guild Update",
            "Advanced tools for strategic leaders",
            "10 NOV 2025",
            "GUILDS",
        ),
    ]
}

pub fn default_patch_notes() -> Vec<PatchNoteEntry> {
    vec![
        patch_note(
            "1.0.0",
            "Initial Crystal Launcher release with server status monitoring.",
        ),
        patch_note(
            "0.9.4",
            "Faster integrity verification and support for multiple regions.",
        ),
        patch_note(
            "0.9.0",
            "Reworked update pipeline with real-time feedback.",
        ),
    ]
}

fn news(title: &str, subtitle: &str, published_at: &str, tag: &str) -> NewsEntry {
    NewsEntry {
        title: title.into(),
        subtitle: subtitle.into(),
        published_at: published_at.into(),
        tag: tag.into(),
    }
}

fn patch_note(version: &str, summary: &str) -> PatchNoteEntry {
    PatchNoteEntry {
        version: version.into(),
        summary: summary.into(),
    }
}
