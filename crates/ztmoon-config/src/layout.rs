//! Derives the on-disk layout shared by every phase of the init sequence.
//!
//! The daemon, the identity tool, and the supervisor all read and write the
//! same configuration root. Every artifact path is derived from that single
//! root so tests can point the whole sequence at a temporary directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Canonical paths for artifacts inside the configuration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    config_dir: PathBuf,
    port_path: PathBuf,
    authtoken_path: PathBuf,
    identity_public_path: PathBuf,
    identity_secret_path: PathBuf,
    networks_dir: PathBuf,
    pid_path: PathBuf,
    moon_descriptor_path: PathBuf,
    moons_dir: PathBuf,
}

impl ConfigLayout {
    /// Port file name.
    pub const PORT_FILE: &'static str = "zerotier-one.port";
    /// API secret file name.
    pub const AUTHTOKEN_FILE: &'static str = "authtoken.secret";
    /// Public identity file name.
    pub const IDENTITY_PUBLIC_FILE: &'static str = "identity.public";
    /// Secret identity file name.
    pub const IDENTITY_SECRET_FILE: &'static str = "identity.secret";
    /// Marker written by the daemon once its identity and config exist.
    pub const PID_FILE: &'static str = "zerotier-one.pid";
    /// Moon descriptor file name.
    pub const MOON_DESCRIPTOR_FILE: &'static str = "moon.json";
    /// Network join directory name.
    pub const NETWORKS_DIR: &'static str = "networks.d";
    /// Signed moon shard directory name.
    pub const MOONS_DIR: &'static str = "moons.d";

    /// Derives every artifact path from the configuration root.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let root: PathBuf = config_dir.into();
        Self {
            port_path: root.join(Self::PORT_FILE),
            authtoken_path: root.join(Self::AUTHTOKEN_FILE),
            identity_public_path: root.join(Self::IDENTITY_PUBLIC_FILE),
            identity_secret_path: root.join(Self::IDENTITY_SECRET_FILE),
            networks_dir: root.join(Self::NETWORKS_DIR),
            pid_path: root.join(Self::PID_FILE),
            moon_descriptor_path: root.join(Self::MOON_DESCRIPTOR_FILE),
            moons_dir: root.join(Self::MOONS_DIR),
            config_dir: root,
        }
    }

    /// The configuration root itself.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.config_dir.as_path()
    }

    /// Path to `zerotier-one.port`.
    #[must_use]
    pub fn port_path(&self) -> &Path {
        self.port_path.as_path()
    }

    /// Path to `authtoken.secret`.
    #[must_use]
    pub fn authtoken_path(&self) -> &Path {
        self.authtoken_path.as_path()
    }

    /// Path to `identity.public`.
    #[must_use]
    pub fn identity_public_path(&self) -> &Path {
        self.identity_public_path.as_path()
    }

    /// Path to `identity.secret`.
    #[must_use]
    pub fn identity_secret_path(&self) -> &Path {
        self.identity_secret_path.as_path()
    }

    /// Directory holding one `<network-id>.conf` per joined network.
    #[must_use]
    pub fn networks_dir(&self) -> &Path {
        self.networks_dir.as_path()
    }

    /// Path to the daemon's PID marker.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to `moon.json`.
    #[must_use]
    pub fn moon_descriptor_path(&self) -> &Path {
        self.moon_descriptor_path.as_path()
    }

    /// Directory receiving signed moon shards.
    #[must_use]
    pub fn moons_dir(&self) -> &Path {
        self.moons_dir.as_path()
    }
}

/// Locations of the two external executables driven by the init sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executables {
    daemon: PathBuf,
    idtool: PathBuf,
}

impl Executables {
    /// Daemon executable name.
    pub const DAEMON: &'static str = "zerotier-one";
    /// Identity tool executable name.
    pub const IDTOOL: &'static str = "zerotier-idtool";
    /// Flag asking the daemon to run without root privileges.
    pub const USER_MODE_FLAG: &'static str = "-U";

    /// Resolves both executables inside `bin_dir`.
    #[must_use]
    pub fn in_dir(bin_dir: impl AsRef<Path>) -> Self {
        let dir = bin_dir.as_ref();
        Self {
            daemon: dir.join(Self::DAEMON),
            idtool: dir.join(Self::IDTOOL),
        }
    }

    /// Path to `zerotier-one`.
    #[must_use]
    pub fn daemon(&self) -> &Path {
        self.daemon.as_path()
    }

    /// Path to `zerotier-idtool`.
    #[must_use]
    pub fn idtool(&self) -> &Path {
        self.idtool.as_path()
    }

    /// Arguments for a user-mode daemon rooted at the layout's config dir.
    #[must_use]
    pub fn daemon_args(layout: &ConfigLayout) -> Vec<OsString> {
        vec![
            OsString::from(Self::USER_MODE_FLAG),
            layout.config_dir().as_os_str().to_owned(),
        ]
    }
}
