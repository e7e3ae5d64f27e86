use std::sync::Arc;

use once_cell::sync::Lazy;
use rankflow::*;

static CONTEXT: Lazy<Arc<Context>> = Lazy::new(|| Context::with_master("local[3]").unwrap());

fn pairs(raw: &[(&str, i32)]) -> Vec<(String, i32)> {
    raw.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn is_narrow(dep: &Dependency) -> bool {
    matches!(dep, Dependency::NarrowDependency(_))
}

#[test]
fn test_group_by() -> Result<()> {
    let sc = CONTEXT.clone();
    let mut vec = (1..=7).map(|i| ("x".to_string(), i)).collect::<Vec<_>>();
    vec.extend((1..=8).map(|i| ("y".to_string(), i)));
    let r = sc.make_rdd(vec, 4)?;
    let g = r.group_by_key(4);
    assert_eq!(g.number_of_splits(), 4);
    let mut res = g.collect()?;
    res.iter_mut().for_each(|(_, vs)| vs.sort());
    res.sort();

    let expected = vec![
        ("x".to_string(), vec![1, 2, 3, 4, 5, 6, 7]),
        ("y".to_string(), vec![1, 2, 3, 4, 5, 6, 7, 8]),
    ];
    assert_eq!(expected, res);
    Ok(())
}

#[test]
fn test_reduce_by_key() -> Result<()> {
    let sc = CONTEXT.clone();
    let r = sc.make_rdd(pairs(&[("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)]), 3)?;
    let mut res = r.reduce_by_key(|(a, b): (i32, i32)| a + b, 2).collect()?;
    res.sort();
    assert_eq!(res, pairs(&[("a", 4), ("b", 7), ("c", 4)]));
    Ok(())
}

#[test]
fn test_combine_by_key() -> Result<()> {
    let sc = CONTEXT.clone();
    let r = sc.make_rdd(pairs(&[("a", 1), ("a", 2), ("b", 10), ("a", 3)]), 2)?;
    // (sum, count) per key
    let aggregator = Aggregator::<String, i32, (i64, usize)>::new(
        Arc::new(|v: i32| (v as i64, 1)),
        Arc::new(|((s, n), v): ((i64, usize), i32)| (s + v as i64, n + 1)),
        Arc::new(|((s1, n1), (s2, n2)): ((i64, usize), (i64, usize))| (s1 + s2, n1 + n2)),
    );
    let mut res = r
        .combine_by_key(aggregator, Box::new(HashPartitioner::<String>::new(3)))
        .collect()?;
    res.sort();
    assert_eq!(
        res,
        vec![("a".to_string(), (6, 3)), ("b".to_string(), (10, 1))]
    );
    Ok(())
}

#[test]
fn test_join() -> Result<()> {
    let sc = CONTEXT.clone();
    let col1 = vec![
        (1, ("A".to_string(), "B".to_string())),
        (2, ("C".to_string(), "D".to_string())),
        (3, ("E".to_string(), "F".to_string())),
        (4, ("G".to_string(), "H".to_string())),
    ];
    let col1 = sc.parallelize(col1, 4)?;
    let col2 = vec![
        (1, "A1".to_string()),
        (1, "A2".to_string()),
        (2, "B1".to_string()),
        (2, "B2".to_string()),
        (3, "C1".to_string()),
        (3, "C2".to_string()),
        (5, "lonely".to_string()),
    ];
    let col2 = sc.parallelize(col2, 4)?;
    let inner_joined_rdd = col2.join(col1.clone(), 4);
    let mut res = inner_joined_rdd.collect()?;
    res.sort();
    let expected = vec![
        (1, ("A1".to_string(), ("A".to_string(), "B".to_string()))),
        (1, ("A2".to_string(), ("A".to_string(), "B".to_string()))),
        (2, ("B1".to_string(), ("C".to_string(), "D".to_string()))),
        (2, ("B2".to_string(), ("C".to_string(), "D".to_string()))),
        (3, ("C1".to_string(), ("E".to_string(), "F".to_string()))),
        (3, ("C2".to_string(), ("E".to_string(), "F".to_string()))),
    ];
    // Keys 4 and 5 exist on one side only and are dropped.
    assert_eq!(res, expected);
    Ok(())
}

#[test]
fn test_cogroup() -> Result<()> {
    let sc = CONTEXT.clone();
    let left = sc.make_rdd(pairs(&[("a", 1), ("a", 2), ("b", 3)]), 2)?;
    let right = sc.make_rdd(vec![("a".to_string(), 'x'), ("c".to_string(), 'y')], 2)?;
    let mut res = left
        .cogroup(right, Box::new(HashPartitioner::<String>::new(2)))
        .collect()?;
    res.iter_mut().for_each(|(_, (vs, _))| vs.sort());
    res.sort();
    assert_eq!(
        res,
        vec![
            ("a".to_string(), (vec![1, 2], vec!['x'])),
            ("b".to_string(), (vec![3], vec![])),
            ("c".to_string(), (vec![], vec!['y'])),
        ]
    );
    Ok(())
}

#[test]
fn test_map_values_keeps_partitioner() -> Result<()> {
    let sc = CONTEXT.clone();
    let grouped = sc
        .make_rdd(pairs(&[("a", 1), ("b", 2), ("a", 3)]), 2)?
        .group_by_key(5);
    let summed = grouped.map_values(|vs: Vec<i32>| vs.iter().sum::<i32>());
    let part = summed.partitioner().expect("map_values keeps the partitioner");
    assert!(part.equals(&HashPartitioner::<String>::new(5)));
    assert_eq!(part.get_num_of_partitions(), 5);

    let flattened = grouped.flat_map_values(|vs: Vec<i32>| {
        Box::new(vs.into_iter()) as Box<dyn Iterator<Item = i32>>
    });
    assert!(flattened.partitioner().is_some());

    // A plain map may change keys, so it forgets the partitioning.
    let remapped = summed.map(|(k, v): (String, i32)| (k, v));
    assert!(remapped.partitioner().is_none());

    // Every key stays in the partition its partitioner assigns it to.
    let placed = summed
        .map_partitions_with_index(
            |(index, iter): (usize, Box<dyn Iterator<Item = (String, i32)>>)| {
                Box::new(iter.map(move |(k, _)| (k, index)))
                    as Box<dyn Iterator<Item = (String, usize)>>
            },
        )
        .collect()?;
    for (key, index) in placed {
        assert_eq!(part.get_partition(&key)?, index);
    }
    Ok(())
}

#[test]
fn test_keys_and_values() -> Result<()> {
    let sc = CONTEXT.clone();
    let r = sc.make_rdd(pairs(&[("a", 1), ("b", 2)]), 1)?;
    assert_eq!(r.keys().collect()?, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(r.values().collect()?, vec![1, 2]);
    Ok(())
}

#[test]
fn test_join_of_co_located_parents_is_narrow() -> Result<()> {
    let sc = CONTEXT.clone();
    let links = sc
        .make_rdd(pairs(&[("a", 1), ("b", 2), ("c", 3)]), 2)?
        .group_by_key(3);
    let ranks = sc
        .make_rdd(pairs(&[("a", 10), ("b", 20)]), 2)?
        .reduce_by_key(|(x, y): (i32, i32)| x + y, 3);

    let co_located = links.cogroup(
        ranks.clone(),
        Box::new(HashPartitioner::<String>::new(3)),
    );
    assert!(co_located.get_dependencies().iter().all(is_narrow));

    let other_count = links.cogroup(ranks, Box::new(HashPartitioner::<String>::new(2)));
    assert!(!other_count.get_dependencies().iter().any(is_narrow));

    let mut joined = links
        .join(
            sc.make_rdd(pairs(&[("a", 10), ("b", 20)]), 2)?
                .reduce_by_key(|(x, y): (i32, i32)| x + y, 3),
            3,
        )
        .collect()?;
    joined.sort();
    assert_eq!(
        joined,
        vec![
            ("a".to_string(), (vec![1], 10)),
            ("b".to_string(), (vec![2], 20)),
        ]
    );
    Ok(())
}

#[test]
fn test_shuffle_outputs_are_reused_across_jobs() -> Result<()> {
    let sc = CONTEXT.clone();
    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = counter.clone();
    let grouped = sc
        .make_rdd(pairs(&[("a", 1), ("b", 2), ("a", 3), ("c", 4)]), 2)?
        .map(move |kv: (String, i32)| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            kv
        })
        .group_by_key(2);
    assert_eq!(grouped.count()?, 3);
    assert_eq!(grouped.collect()?.len(), 3);
    // The map side ran once, for the first job only.
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn test_cache_computes_each_partition_once() -> Result<()> {
    let sc = CONTEXT.clone();
    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = counter.clone();
    let cached = sc
        .make_rdd(pairs(&[("a", 1), ("b", 2), ("a", 3), ("c", 4)]), 2)?
        .map(move |kv: (String, i32)| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            kv
        })
        .cache();
    // Both sides of the join read the cached RDD within a single job.
    let doubled = cached.map_values(|v: i32| v * 2);
    let mut joined = cached.join(doubled, 3).collect()?;
    joined.sort();
    assert_eq!(
        joined,
        vec![
            ("a".to_string(), (1, 2)),
            ("a".to_string(), (1, 6)),
            ("a".to_string(), (3, 2)),
            ("a".to_string(), (3, 6)),
            ("b".to_string(), (2, 4)),
            ("c".to_string(), (4, 8)),
        ]
    );
    assert_eq!(cached.count()?, 4);
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn test_cache_keeps_partitioner() -> Result<()> {
    let sc = CONTEXT.clone();
    let grouped = sc
        .make_rdd(pairs(&[("a", 1), ("b", 2)]), 2)?
        .group_by_key(4)
        .cache();
    let part = grouped.partitioner().expect("cache keeps the partitioner");
    assert!(part.equals(&HashPartitioner::<String>::new(4)));
    assert!(is_narrow(&grouped.get_dependencies()[0]));
    Ok(())
}
