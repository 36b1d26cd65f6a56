//! Selection of cgroups by path.

use regex::RegexSet;

/// Filter on the path of the cgroups.
///
/// A path is accepted if one of the patterns matches at its start.
/// An empty filter accepts every path.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    set: Option<RegexSet>,
}

impl NameFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let anchored: Vec<String> = patterns
            .into_iter()
            .map(|p| format!("^(?:{})", p.as_ref()))
            .collect();
        if anchored.is_empty() {
            return Ok(Self::default());
        }
        let set = RegexSet::new(anchored)?;
        Ok(Self { set: Some(set) })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.set.as_ref().is_none_or(|set| set.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let filter = NameFilter::new(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches("anything"));
        assert!(filter.matches("/"));
    }

    #[test]
    fn anchored_at_start() {
        let filter = NameFilter::new(["^db/"]).unwrap();
        assert!(filter.matches("db/a"));
        assert!(!filter.matches("cache/b"));

        // like a regex "match", not a "search"
        let filter = NameFilter::new(["a1"]).unwrap();
        assert!(filter.matches("a1"));
        assert!(filter.matches("a1/x"));
        assert!(!filter.matches("a/a1"));
    }

    #[test]
    fn patterns_are_or_combined() {
        let filter = NameFilter::new(["system\\.slice", "work.*/db$"]).unwrap();
        assert!(filter.matches("system.slice/sshd.service"));
        assert!(filter.matches("workload.slice/db"));
        assert!(!filter.matches("workload.slice/db2"));
        assert!(!filter.matches("user.slice"));

        // each alternative of a pattern is anchored
        let filter = NameFilter::new(["x|y"]).unwrap();
        assert!(filter.matches("y/z"));
        assert!(!filter.matches("zy"));
    }

    #[test]
    fn invalid_pattern() {
        assert!(NameFilter::new(["("]).is_err());
    }
}
