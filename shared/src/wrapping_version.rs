use crate::Version;

const HALF_RANGE: Version = 1 << 31;

/// Returns whether version `v1` is ahead of `v2`, allowing for wraparound
/// version_greater_than(2, 1) will return true
/// version_greater_than(0, u32::MAX) will return true
/// version_greater_than(1, 1) will return false
pub fn version_greater_than(v1: Version, v2: Version) -> bool {
    ((v1 > v2) && (v1 - v2 <= HALF_RANGE)) || ((v1 < v2) && (v2 - v1 > HALF_RANGE))
}

/// Returns whether version `v1` is behind `v2`, allowing for wraparound
pub fn version_less_than(v1: Version, v2: Version) -> bool {
    version_greater_than(v2, v1)
}
