//! Injection/patch site rotation.

/// Site to use after `last_used`.
///
/// An empty rotation has no next site. A missing or unknown last site restarts
/// the rotation at its first entry.
pub fn next_site<'a, S: AsRef<str>>(rotation: &'a [S], last_used: Option<&str>) -> Option<&'a S> {
    let first = rotation.first()?;
    let Some(last) = last_used else {
        return Some(first);
    };
    match rotation.iter().position(|s| s.as_ref() == last) {
        Some(idx) => rotation.get((idx + 1) % rotation.len()),
        None => Some(first),
    }
}

/// The next `count` sites following `last_used`.
pub fn site_sequence<'a, S: AsRef<str>>(
    rotation: &'a [S],
    last_used: Option<&str>,
    count: usize,
) -> Vec<&'a S> {
    let mut out = Vec::new();
    let mut last = last_used;
    for _ in 0..count {
        let Some(site) = next_site(rotation, last) else {
            break;
        };
        out.push(site);
        last = Some(site.as_ref());
    }
    out
}
