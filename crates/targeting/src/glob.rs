//! Minimal case-sensitive shell-glob matcher supporting `*` and `?`.
//!
//! None of the repos this codebase leans on pull in a glob crate for a
//! two-metacharacter pattern language, so the matcher lives here. `*`
//! matches any run of characters (including `/`), `?` matches exactly one.

/// Match `text` against a shell-glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    // Backtracking state for the most recent `*`.
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star {
            // Let the last `*` absorb one more character and retry.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}
