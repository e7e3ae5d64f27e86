use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use rankflow::pagerank::{self, PageRank};
use rankflow::*;

static CONTEXT: Lazy<Arc<Context>> = Lazy::new(|| Context::with_master("local[4]").unwrap());

fn lines(raw: &[&str], partitions: usize) -> Result<Arc<dyn Rdd<Item = String>>> {
    CONTEXT.make_rdd(raw.iter().map(|l| l.to_string()).collect::<Vec<_>>(), partitions)
}

fn input_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rankflow-edges-{}.txt", uuid::Uuid::new_v4()));
    fs::write(&path, contents).unwrap();
    path
}

fn sorted(mut ranks: Vec<(String, f64)>) -> Vec<(String, f64)> {
    ranks.sort_by(|a, b| a.0.cmp(&b.0));
    ranks
}

/// Single threaded evaluation of the same recurrence.
fn reference_ranks(raw: &[&str], iterations: usize) -> HashMap<String, f64> {
    let mut links: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut ranks: HashMap<String, f64> = HashMap::new();
    for line in raw {
        let (source, target) = pagerank::parse_edge(line).unwrap();
        ranks.insert(target.clone(), 1.0);
        links.entry(source).or_default().insert(target);
    }
    for _ in 0..iterations {
        let mut contributions: HashMap<String, f64> = HashMap::new();
        for (source, neighbors) in &links {
            if let Some(rank) = ranks.get(source) {
                for n in neighbors {
                    *contributions.entry(n.clone()).or_default() += rank / neighbors.len() as f64;
                }
            }
        }
        ranks = contributions
            .into_iter()
            .map(|(id, sum)| (id, 0.15 + 0.85 * sum))
            .collect();
    }
    ranks
}

#[test]
fn two_nodes_keep_rank_one() -> Result<()> {
    let lines = lines(&["A B", "B A"], 2)?;
    let ranks = sorted(PageRank::new(1, 2)?.run(&lines)?);
    assert_eq!(
        ranks,
        vec![("A".to_string(), 1.0), ("B".to_string(), 1.0)]
    );
    let output: Vec<_> = ranks.iter().map(|(id, r)| pagerank::render(id, *r)).collect();
    assert_eq!(output, vec!["A has rank: 1.0.", "B has rank: 1.0."]);
    Ok(())
}

#[test]
fn initial_ranks_cover_exactly_the_targets() -> Result<()> {
    let lines = lines(&["a b", "a c", "b c", "d a", "a b"], 3)?;
    let job = PageRank::new(1, 3)?;
    let initial = sorted(job.initial_ranks(&lines).collect()?);
    assert_eq!(
        initial,
        vec![
            ("a".to_string(), 1.0),
            ("b".to_string(), 1.0),
            ("c".to_string(), 1.0)
        ]
    );

    let mut links = job.links(&lines).collect()?;
    links.iter_mut().for_each(|(_, ns)| ns.sort());
    links.sort();
    assert_eq!(
        links,
        vec![
            ("a".to_string(), vec!["b".to_string(), "c".to_string()]),
            ("b".to_string(), vec!["c".to_string()]),
            ("d".to_string(), vec!["a".to_string()]),
        ]
    );
    Ok(())
}

#[test]
fn contributions_of_a_source_sum_to_its_rank() -> Result<()> {
    let lines = lines(&["a b", "a c", "a d", "b a"], 2)?;
    let job = PageRank::new(1, 2)?;
    let links = job.links(&lines);
    let ranks = CONTEXT.make_rdd(vec![("a".to_string(), 0.9), ("b".to_string(), 0.3)], 2)?;
    let contributions = job.contributions(&links, &ranks).collect()?;
    assert_eq!(contributions.len(), 4);
    let from_a: f64 = contributions
        .iter()
        .filter(|(id, _)| id != "a")
        .map(|(_, c)| c)
        .sum();
    assert!((from_a - 0.9).abs() < 1e-9);
    Ok(())
}

#[test]
fn source_only_identifiers_never_get_a_rank() -> Result<()> {
    let lines = lines(&["s a", "a b", "b a"], 2)?;
    for iterations in 1..4 {
        let ranks = PageRank::new(iterations, 2)?.run(&lines)?;
        assert!(ranks.iter().all(|(id, _)| id != "s"));
    }
    Ok(())
}

#[test]
fn identifiers_without_contributions_disappear() -> Result<()> {
    // `b` is only linked from `a`, which never has a rank.
    let lines = lines(&["a b", "b c"], 2)?;
    let ranks = PageRank::new(1, 2)?.run(&lines)?;
    assert_eq!(ranks, vec![("c".to_string(), 0.15 + 0.85 * 1.0)]);
    // `c` links nowhere, so nothing is left after the second round.
    assert!(PageRank::new(2, 2)?.run(&lines)?.is_empty());
    Ok(())
}

#[test]
fn matches_sequential_evaluation() -> Result<()> {
    let raw = [
        "url_1 url_4",
        "url_2 url_1",
        "url_3 url_2",
        "url_3 url_1",
        "url_4 url_3",
        "url_4 url_1",
        "url_4\turl_2   trailing tokens",
        "url_1 url_4",
    ];
    for partitions in &[1, 3, 5] {
        let computed = PageRank::new(10, *partitions)?.run(&lines(&raw, 2)?)?;
        let expected = reference_ranks(&raw, 10);
        assert_eq!(computed.len(), expected.len());
        for (id, rank) in computed {
            assert!(
                (rank - expected[&id]).abs() < 1e-9,
                "{} ranked {} instead of {}",
                id,
                rank,
                expected[&id]
            );
        }
    }
    Ok(())
}

#[test]
fn runs_from_a_text_file() -> Result<()> {
    let path = input_file("1 2\n1 3\n2 3\r\n3 1\n");
    let text = CONTEXT.text_file(&path, 3)?;
    let computed = sorted(PageRank::new(5, 3)?.run(&text)?);
    let expected = reference_ranks(&["1 2", "1 3", "2 3", "3 1"], 5);
    assert_eq!(computed.len(), 3);
    for (id, rank) in computed {
        assert!((rank - expected[&id]).abs() < 1e-9);
    }
    fs::remove_file(path).unwrap();
    Ok(())
}

#[test]
fn malformed_line_aborts_the_run() -> Result<()> {
    let lines = lines(&["a b", "just-one-token", "b a"], 3)?;
    match PageRank::new(2, 2)?.run(&lines) {
        Err(Error::MalformedLine { line }) => assert_eq!(line, "just-one-token"),
        other => panic!("expected a malformed line error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn input_is_read_once_per_run() -> Result<()> {
    let raw = ["a b", "b c", "c a", "a c"];
    let reads = Arc::new(AtomicUsize::new(0));
    let seen = reads.clone();
    let counted = lines(&raw, 2)?.map(move |line: String| {
        seen.fetch_add(1, Ordering::SeqCst);
        line
    });
    let ranks = PageRank::new(4, 3)?.run(&counted)?;
    assert_eq!(ranks.len(), 3);
    // Links and initial ranks share one read of every line.
    assert_eq!(reads.load(Ordering::SeqCst), raw.len());
    Ok(())
}

#[test]
fn leading_whitespace_makes_an_empty_source() -> Result<()> {
    // The edges are `"" -> a` and `a -> c`, so `a` starts with a rank.
    let ranks = sorted(PageRank::new(1, 2)?.run(&lines(&[" a b", "a c"], 2)?)?);
    assert_eq!(ranks, vec![("c".to_string(), 0.15 + 0.85 * 1.0)]);
    Ok(())
}
