use std::fs::{create_dir_all, File};
use std::io::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rankflow::io::LocalFsReaderConfig;
use rankflow::*;

static CONTEXT: Lazy<Arc<Context>> = Lazy::new(|| Context::with_master("local[4]").unwrap());
static WORK_DIR: Lazy<PathBuf> = Lazy::new(std::env::temp_dir);
const TEST_DIR: &str = "rankflow_test_dir";

fn set_up(file_name: &str, fixture: &[u8]) -> PathBuf {
    let temp_dir = WORK_DIR.join(TEST_DIR);
    create_dir_all(&temp_dir).unwrap();
    let path = temp_dir.join(file_name);
    let mut f = File::create(&path).unwrap();
    f.write_all(fixture).unwrap();
    path
}

#[test]
fn test_make_rdd() -> Result<()> {
    let sc = CONTEXT.clone();
    let col = sc.make_rdd((0..10).collect::<Vec<_>>(), 32)?;
    let vec_iter = col.map(|i: i32| (0..i).collect::<Vec<_>>());
    let res = vec_iter.collect()?;
    let expected = (0..10)
        .map(|i| (0..i).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    assert_eq!(expected, res);
    Ok(())
}

#[test]
fn test_zero_partitions_is_rejected() {
    let sc = CONTEXT.clone();
    assert!(matches!(
        sc.make_rdd(vec![1, 2, 3], 0),
        Err(Error::InvalidPartitionCount)
    ));
}

#[test]
fn test_map_partitions() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd(vec![1i64, 2, 3, 4], 2)?;
    let partition_sums = rdd
        .map_partitions(|iter: Box<dyn Iterator<Item = i64>>| {
            Box::new(std::iter::once(iter.sum::<i64>())) as Box<dyn Iterator<Item = i64>>
        })
        .collect()?;
    assert_eq!(partition_sums, vec![3, 7]);
    Ok(())
}

#[test]
fn test_map_partitions_with_index() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd(vec!["a", "b", "c"].into_iter().map(String::from), 3)?;
    let tagged = rdd
        .map_partitions_with_index(|(index, iter): (usize, Box<dyn Iterator<Item = String>>)| {
            Box::new(iter.map(move |s| format!("{}{}", s, index)))
                as Box<dyn Iterator<Item = String>>
        })
        .collect()?;
    assert_eq!(tagged, vec!["a0", "b1", "c2"]);
    Ok(())
}

#[test]
fn test_flat_map() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd(vec![0usize, 1, 2, 3], 2)?;
    let res = rdd
        .flat_map(|n: usize| Box::new(std::iter::repeat(n).take(n)) as Box<dyn Iterator<Item = usize>>)
        .collect()?;
    assert_eq!(res, vec![1, 2, 2, 3, 3, 3]);
    Ok(())
}

#[test]
fn test_fold() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd((-1000..1000).collect::<Vec<_>>(), 10)?;
    let sum = rdd.fold(0, |(c, x): (i32, i32)| c + x)?;
    assert_eq!(sum, -1000);
    Ok(())
}

#[test]
fn test_fold_with_modifying_initial_value() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc
        .make_rdd((-1000..1000).collect::<Vec<i32>>(), 10)?
        .map(|x: i32| vec![x]);
    let f = |(mut c, x): (Vec<i32>, Vec<i32>)| {
        c[0] += x[0];
        c
    };
    let sum = rdd.fold(vec![0], f)?;
    assert_eq!(sum[0], -1000);
    Ok(())
}

#[test]
fn test_reduce() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd((1..=100).collect::<Vec<u64>>(), 7)?;
    assert_eq!(rdd.reduce(|(a, b): (u64, u64)| a + b)?, Some(5050));

    let empty = sc.make_rdd(Vec::<u64>::new(), 3)?;
    assert_eq!(empty.reduce(|(a, b): (u64, u64)| a + b)?, None);
    Ok(())
}

#[test]
fn test_count_and_take() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd((0..25).collect::<Vec<u32>>(), 4)?;
    assert_eq!(rdd.count()?, 25);
    assert_eq!(rdd.take(8)?, (0..8).collect::<Vec<_>>());
    assert_eq!(rdd.take(0)?, Vec::<u32>::new());
    assert_eq!(rdd.first()?, 0);

    let empty = sc.make_rdd(Vec::<u32>::new(), 2)?;
    assert!(empty.first().is_err());
    Ok(())
}

#[test]
fn test_for_each() -> Result<()> {
    let sc = CONTEXT.clone();
    let total = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let sink = total.clone();
    let units = sc.make_rdd((1..=10).collect::<Vec<usize>>(), 3)?.for_each(move |n: usize| {
        sink.fetch_add(n, std::sync::atomic::Ordering::SeqCst);
    })?;
    assert_eq!(units.len(), 3);
    assert_eq!(total.load(std::sync::atomic::Ordering::SeqCst), 55);
    Ok(())
}

#[test]
fn test_distinct() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.parallelize(vec![1, 2, 2, 2, 3, 3, 3, 4, 4, 5], 3)?;
    let mut res = rdd.distinct().collect()?;
    res.sort();
    assert_eq!(res, vec![1, 2, 3, 4, 5]);
    assert_eq!(rdd.distinct_with_num_partitions(7).count()?, 5);
    Ok(())
}

#[test]
fn test_for_each_partition_with_context() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd((0..12).collect::<Vec<u8>>(), 3)?;
    let seen = Arc::new(parking_lot::Mutex::new(vec![]));
    let sink = seen.clone();
    rdd.for_each_partition_with_context(
        move |(ctx, iter): (TaskContext, Box<dyn Iterator<Item = u8>>)| {
            sink.lock().push((ctx.split_id, iter.count()));
        },
    )?;
    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec![(0, 4), (1, 4), (2, 4)]);
    Ok(())
}

#[test]
fn test_try_map_error_aborts_job() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd(vec!["a b".to_owned(), "broken".to_owned()], 2)?;
    let parsed = rdd.try_map(|line: String| pagerank::parse_edge(&line));
    match parsed.collect() {
        Err(Error::MalformedLine { line }) => assert_eq!(line, "broken"),
        other => panic!("expected a malformed line error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_panicking_task_fails_job() -> Result<()> {
    let sc = CONTEXT.clone();
    let rdd = sc.make_rdd((0..8).collect::<Vec<i32>>(), 4)?;
    let res = rdd
        .map(|x: i32| {
            if x == 5 {
                panic!("bad record {}", x);
            }
            x
        })
        .collect();
    match res {
        Err(Error::TaskFailed { reason, .. }) => assert!(reason.contains("bad record 5")),
        other => panic!("expected a task failure, got {:?}", other),
    }
    // The context keeps working after a failed job.
    assert_eq!(rdd.count()?, 8);
    Ok(())
}

#[test]
fn test_read_files() -> Result<()> {
    let path = set_up(
        "test_file_1",
        b"This is some textual test data.\r\nCan be converted to strings and there are two lines.\n",
    );
    let sc = CONTEXT.clone();
    let lines = sc.text_file(&path, 3)?;
    assert_eq!(lines.number_of_splits(), 3);
    assert_eq!(
        lines.collect()?,
        vec![
            "This is some textual test data.",
            "Can be converted to strings and there are two lines."
        ]
    );

    let word_counts = sc.read_source(LocalFsReaderConfig::new(&path), |line: String| {
        line.split_whitespace().count()
    })?;
    assert_eq!(word_counts.collect()?, vec![6, 10]);
    Ok(())
}

#[test]
fn test_read_directory() -> Result<()> {
    let dir = WORK_DIR.join(TEST_DIR).join(uuid::Uuid::new_v4().to_string());
    create_dir_all(&dir).unwrap();
    File::create(dir.join("b.txt")).unwrap().write_all(b"3\n4\n").unwrap();
    File::create(dir.join("a.txt")).unwrap().write_all(b"1\n2\n").unwrap();
    File::create(dir.join("skip.csv")).unwrap().write_all(b"9\n").unwrap();

    let sc = CONTEXT.clone();
    let config = LocalFsReaderConfig::new(&dir).filter_extension("txt");
    let numbers = sc.read_source(config, |line: String| line.parse::<u32>().unwrap_or(0))?;
    assert_eq!(numbers.collect()?, vec![1, 2, 3, 4]);
    std::fs::remove_dir_all(&dir).unwrap();
    Ok(())
}

#[test]
fn test_missing_input_file() {
    let sc = CONTEXT.clone();
    let path = WORK_DIR.join(TEST_DIR).join("does-not-exist.txt");
    assert!(matches!(sc.text_file(path, 1), Err(Error::InputRead(_))));
}
