/// Casa `key` contra um glob onde `*` significa "zero ou mais caracteres".
///
/// O match é ancorado nas duas pontas: sem `*`, só a própria chave casa.
/// Nenhum outro metacaractere é interpretado.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p = pattern.as_bytes();
    let k = key.as_bytes();

    let (mut pi, mut ki) = (0, 0);
    // Posição do último `*` visto e de onde o texto estava naquele momento.
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ki));
            pi += 1;
        } else if pi < p.len() && p[pi] == k[ki] {
            pi += 1;
            ki += 1;
        } else if let Some((star, matched)) = backtrack {
            // `*` engole mais um caractere
            pi = star + 1;
            ki = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "user:123"));
    }

    #[test]
    fn literal_is_exact_match() {
        assert!(glob_match("user:123", "user:123"));
        assert!(!glob_match("user", "user:123"));
        assert!(!glob_match("ser:123", "user:123"));
    }

    #[test]
    fn prefix_pattern() {
        assert!(glob_match("user:*", "user:123"));
        assert!(glob_match("user:*", "user:"));
        assert!(!glob_match("user:*", "session:abc"));
        assert!(!glob_match("user:*", "xuser:1"));
    }

    #[test]
    fn suffix_and_infix_patterns() {
        assert!(glob_match("*:lock", "jobs:lock"));
        assert!(!glob_match("*:lock", "jobs:lock:1"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(glob_match("a*b*c", "abc"));
        assert!(!glob_match("a*b*c", "acb"));
    }

    #[test]
    fn overlapping_segments() {
        // O último segmento não pode reaproveitar o que o anterior consumiu
        assert!(!glob_match("*ab*ab", "xab"));
        assert!(glob_match("*ab*ab", "xabab"));
        assert!(glob_match("*aab", "aaab"));
    }

    #[test]
    fn consecutive_stars() {
        assert!(glob_match("user:**", "user:1"));
        assert!(glob_match("**", ""));
    }
}
