use rand::seq::IndexedRandom;

/// HTTP proxies to spread outbound requests over.
///
/// Selection is uniform with replacement. Failing proxies are not tracked;
/// a retry simply draws again.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new<I, S>(proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            proxies: proxies
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// One proxy per line; blank lines are ignored.
    pub fn from_lines(contents: &str) -> Self {
        Self::new(contents.lines())
    }

    pub fn random_proxy(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::rng())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

/// Bare `host:port` (optionally with credentials) entries are taken as HTTP proxies.
pub fn normalize_proxy_url(proxy: &str) -> String {
    if proxy.starts_with("http") || proxy.starts_with("socks") {
        proxy.to_string()
    } else {
        format!("http://{proxy}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_yields_none() {
        let pool = ProxyPool::from_lines("\n  \n");
        assert!(pool.is_empty());
        assert_eq!(pool.random_proxy(), None);
    }

    #[test]
    fn test_random_proxy_comes_from_pool() {
        let pool = ProxyPool::from_lines("1.1.1.1:8080\n user:pass@2.2.2.2:3128 \n");
        assert_eq!(pool.len(), 2);
        for _ in 0..20 {
            let proxy = pool.random_proxy().unwrap();
            assert!(proxy == "1.1.1.1:8080" || proxy == "user:pass@2.2.2.2:3128");
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_proxy_url("1.1.1.1:80"), "http://1.1.1.1:80");
        assert_eq!(normalize_proxy_url("https://1.1.1.1:80"), "https://1.1.1.1:80");
        assert_eq!(normalize_proxy_url("socks5://h:1"), "socks5://h:1");
    }
}
