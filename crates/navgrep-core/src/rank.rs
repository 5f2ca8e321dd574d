use std::collections::HashSet;

use crate::types::SearchResult;

/// |A ∩ B| / |A ∪ B| over path segments.
pub fn jaccard_index(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = segments(a).collect();
    let right: HashSet<&str> = segments(b).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Order results by path similarity to `origin_path`, most similar first.
/// Equal scores keep their original relative order.
pub fn sort_by_proximity(results: &mut [SearchResult], origin_path: &str) {
    results.sort_by(|a, b| {
        let left = jaccard_index(&a.file, origin_path);
        let right = jaccard_index(&b.file, origin_path);
        right
            .partial_cmp(&left)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    fn result(file: &str) -> SearchResult {
        SearchResult {
            repository: "r".to_string(),
            revision: "v".to_string(),
            file: file.to_string(),
            range: Range::default(),
            preview: None,
            symbol_name: None,
            symbol_kind: None,
            container_name: None,
            file_local: false,
        }
    }

    #[test]
    fn nearer_paths_rank_first() {
        let mut results = vec![result("x/y/z.ts"), result("a/b/d.ts")];
        sort_by_proximity(&mut results, "a/b/c.ts");
        assert_eq!(results[0].file, "a/b/d.ts");
        assert_eq!(results[1].file, "x/y/z.ts");
    }

    #[test]
    fn ties_keep_input_order() {
        let mut results = vec![result("p/one.ts"), result("q/two.ts"), result("a/three.ts")];
        sort_by_proximity(&mut results, "a/b/c.ts");
        let order: Vec<&str> = results.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(order, vec!["a/three.ts", "p/one.ts", "q/two.ts"]);
    }

    #[test]
    fn jaccard_bounds() {
        assert_eq!(jaccard_index("a/b", "a/b"), 1.0);
        assert_eq!(jaccard_index("a/b", "c/d"), 0.0);
        assert_eq!(jaccard_index("", ""), 0.0);
        assert!((jaccard_index("a/b/c.ts", "a/b/d.ts") - 0.5).abs() < f64::EPSILON);
    }
}
