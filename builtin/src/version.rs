use std::ops::Range;

use fil_trace_api::{Error, Network, Result};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::version::NetworkVersion;

/// A protocol version, activated at a height that differs per network.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Version {
    ordinal: u32,
    actors: u32,
    mainnet: ChainEpoch,
    calibration: ChainEpoch,
}

impl Version {
    pub const fn new(ordinal: u32, actors: u32, mainnet: ChainEpoch, calibration: ChainEpoch) -> Self {
        Self { ordinal, actors, mainnet, calibration }
    }

    /// The network version number.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn network_version(&self) -> NetworkVersion {
        NetworkVersion::new(self.ordinal)
    }

    /// The built-in actors release whose method tables apply under this version.
    pub fn actors_version(&self) -> u32 {
        self.actors
    }

    pub fn activation(&self, network: Network) -> ChainEpoch {
        match network {
            Network::Mainnet => self.mainnet,
            Network::Calibration => self.calibration,
        }
    }
}

// Network versions 0 through 16 all activate at genesis on calibration, which was reset at v16.
const FILECOIN_VERSIONS: &[Version] = &[
    Version::new(0, 0, 0, 0),
    Version::new(1, 0, 41280, 0),
    Version::new(2, 0, 51000, 0),
    Version::new(3, 0, 94000, 0),
    Version::new(4, 2, 138720, 0),
    Version::new(5, 2, 140760, 0),
    Version::new(6, 2, 170000, 0),
    Version::new(7, 2, 265200, 0),
    Version::new(8, 2, 272400, 0),
    Version::new(9, 2, 336458, 0),
    Version::new(10, 3, 550321, 0),
    Version::new(11, 3, 665280, 0),
    Version::new(12, 4, 712320, 0),
    Version::new(13, 5, 892800, 0),
    Version::new(14, 6, 1231620, 0),
    Version::new(15, 7, 1594680, 0),
    Version::new(16, 8, 1960320, 0),
    Version::new(17, 9, 2383680, 16800),
    Version::new(18, 10, 2683348, 322354),
    Version::new(19, 10, 2809800, 489094),
    Version::new(20, 11, 2870280, 492214),
    Version::new(21, 12, 3469380, 1013134),
    Version::new(22, 13, 3855360, 1427974),
    Version::new(23, 14, 4154640, 1779094),
    Version::new(24, 15, 4461240, 2078794),
    Version::new(25, 16, 4867320, 2523454),
];

/// Ordered protocol versions with their activation heights.
#[derive(Clone, Debug)]
pub struct VersionRegistry {
    versions: Vec<Version>,
}

impl VersionRegistry {
    /// Creates a registry, checking that ordinals strictly increase and that activation heights
    /// never decrease on either network.
    pub fn new(versions: Vec<Version>) -> Result<Self> {
        if versions.is_empty() {
            return Err(Error::Config("version registry is empty".to_string()));
        }
        for pair in versions.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.ordinal <= a.ordinal {
                return Err(Error::Config(format!(
                    "version ordinals not increasing: {} then {}",
                    a.ordinal, b.ordinal
                )));
            }
            for network in [Network::Mainnet, Network::Calibration] {
                if b.activation(network) < a.activation(network) {
                    return Err(Error::Config(format!(
                        "version {} activates on {} before version {}",
                        b.ordinal, network, a.ordinal
                    )));
                }
            }
        }
        Ok(Self { versions })
    }

    /// The Filecoin mainnet and calibration upgrade schedule.
    pub fn filecoin() -> Self {
        Self { versions: FILECOIN_VERSIONS.to_vec() }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> &Version {
        &self.versions[self.versions.len() - 1]
    }

    pub fn version(&self, ordinal: u32) -> Option<&Version> {
        self.versions.iter().find(|v| v.ordinal == ordinal)
    }

    /// The version active at a height.
    /// Heights before the first activation resolve to the earliest version and heights past
    /// the last to the latest. Of versions sharing an activation height, the later wins.
    pub fn resolve(&self, network: Network, height: ChainEpoch) -> &Version {
        let idx = self.versions.partition_point(|v| v.activation(network) <= height);
        &self.versions[idx.saturating_sub(1)]
    }

    /// The heights `[min, max)` at which a version is active on a network.
    /// The range is empty for a version superseded at its own activation height, and
    /// open-ended (`ChainEpoch::MAX`) for the latest version.
    pub fn range(&self, network: Network, ordinal: u32) -> Option<Range<ChainEpoch>> {
        let idx = self.versions.iter().position(|v| v.ordinal == ordinal)?;
        let start = self.versions[idx].activation(network);
        let end = self.versions.get(idx + 1).map(|v| v.activation(network)).unwrap_or(ChainEpoch::MAX);
        Some(start..end)
    }

    /// Iterates over versions from `ordinal` to the latest, skipping versions that are never
    /// active on the network. Starting from an unknown ordinal yields versions after it.
    pub fn iter_from(&self, ordinal: u32, network: Network) -> VersionIter<'_> {
        let next = self.versions.partition_point(|v| v.ordinal < ordinal);
        VersionIter { registry: self, network, next }
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::filecoin()
    }
}

/// A lazy iterator over a registry's versions. Clone it to restart from the same point.
#[derive(Clone, Debug)]
pub struct VersionIter<'a> {
    registry: &'a VersionRegistry,
    network: Network,
    next: usize,
}

impl<'a> Iterator for VersionIter<'a> {
    type Item = &'a Version;

    fn next(&mut self) -> Option<Self::Item> {
        let versions = &self.registry.versions;
        while self.next < versions.len() {
            let idx = self.next;
            self.next += 1;
            let shadowed = versions
                .get(idx + 1)
                .map(|n| n.activation(self.network) == versions[idx].activation(self.network))
                .unwrap_or(false);
            if !shadowed {
                return Some(&versions[idx]);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn filecoin_schedule_is_valid() {
        assert!(VersionRegistry::new(FILECOIN_VERSIONS.to_vec()).is_ok());
    }

    #[test]
    fn rejects_misordered_versions() {
        let v = vec![Version::new(1, 0, 100, 0), Version::new(2, 0, 50, 0)];
        assert!(matches!(VersionRegistry::new(v), Err(Error::Config(_))));
        let v = vec![Version::new(2, 0, 0, 0), Version::new(2, 0, 10, 10)];
        assert!(VersionRegistry::new(v).is_err());
        assert!(VersionRegistry::new(vec![]).is_err());
    }

    #[test]
    fn resolves_mainnet_heights() {
        let reg = VersionRegistry::filecoin();
        assert_eq!(0, reg.resolve(Network::Mainnet, -10).ordinal());
        assert_eq!(0, reg.resolve(Network::Mainnet, 41279).ordinal());
        assert_eq!(1, reg.resolve(Network::Mainnet, 41280).ordinal());
        assert_eq!(18, reg.resolve(Network::Mainnet, 2683348).ordinal());
        assert_eq!(25, reg.resolve(Network::Mainnet, ChainEpoch::MAX).ordinal());
    }

    #[test]
    fn shared_activation_resolves_to_later_version() {
        let reg = VersionRegistry::filecoin();
        assert_eq!(16, reg.resolve(Network::Calibration, 0).ordinal());
        assert_eq!(16, reg.resolve(Network::Calibration, 16799).ordinal());
        assert_eq!(17, reg.resolve(Network::Calibration, 16800).ordinal());
    }

    #[test]
    fn ranges() {
        let reg = VersionRegistry::filecoin();
        assert_eq!(Some(41280..51000), reg.range(Network::Mainnet, 1));
        assert_eq!(Some(4867320..ChainEpoch::MAX), reg.range(Network::Mainnet, 25));
        assert!(reg.range(Network::Calibration, 3).unwrap().is_empty());
        assert_eq!(None, reg.range(Network::Mainnet, 99));
    }

    #[test]
    fn iteration_is_restartable() {
        let reg = VersionRegistry::filecoin();
        let it = reg.iter_from(23, Network::Mainnet);
        let first: Vec<u32> = it.clone().map(Version::ordinal).collect();
        let second: Vec<u32> = it.map(Version::ordinal).collect();
        assert_eq!(vec![23, 24, 25], first);
        assert_eq!(first, second);

        let calib: Vec<u32> = reg.iter_from(0, Network::Calibration).map(Version::ordinal).collect();
        assert_eq!(16, calib[0]);
        assert_eq!(10, calib.len());
    }

    #[quickcheck]
    fn resolve_is_monotonic(a: i64, b: i64, calibration: bool) -> bool {
        let reg = VersionRegistry::filecoin();
        let network = if calibration { Network::Calibration } else { Network::Mainnet };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        reg.resolve(network, lo).ordinal() <= reg.resolve(network, hi).ordinal()
    }
}
