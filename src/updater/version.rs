// Dotted-numeric version comparison

/// True when `latest` is strictly newer than `current`.
///
/// Leading `v` prefixes are stripped, components compare numerically, and
/// uneven lengths pad with zeros ("1.2" == "1.2.0"). Versions with
/// non-numeric components compare as not-newer.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    let (Some(current), Some(latest)) = (parse_components(current), parse_components(latest))
    else {
        return false;
    };

    let len = current.len().max(latest.len());
    for i in 0..len {
        let c = current.get(i).copied().unwrap_or(0);
        let l = latest.get(i).copied().unwrap_or(0);
        if l != c {
            return l > c;
        }
    }
    false
}

fn parse_components(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}
