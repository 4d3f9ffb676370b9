pub const DEFAULT_CONFIG_PATH: &str = "/etc/forgehook/config.toml";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000/";
pub const DEFAULT_REPO_ROOT_PATH: &str = "/var/lib/forgejo/repositories";

/// Value of `BUILD_SUBMITTER` injected into CI build manifests.
pub const BUILD_SUBMITTER: &str = "forgejo";

pub const TITLE_DISPLAY_LIMIT: usize = 277;
pub const DEFAULT_PAYLOAD_COMMIT_LIMIT: usize = 15;
