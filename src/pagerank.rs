//! Iterative PageRank over an edge list.
//!
//! Every input line holds a source and a target identifier separated by
//! whitespace. The links table groups the distinct targets of each source,
//! ranks start at `1.0` for every identifier that is the target of some edge,
//! and each iteration replaces the ranks by
//! `RESET_PROBABILITY + DAMPING_FACTOR * sum(contributions)`.
//!
//! Identifiers that receive no contribution in an iteration drop out of the
//! ranks table, and sources without a rank contribute nothing.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rdd::{PairRdd, Rdd};

pub const DAMPING_FACTOR: f64 = 0.85;
pub const RESET_PROBABILITY: f64 = 0.15;

/// Decimal places kept when printing a rank.
pub const OUTPUT_PLACES: u32 = 2;

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Splits a line on runs of ASCII whitespace into `(source, target)`.
///
/// Leading whitespace yields an empty source, and tokens past the second one
/// are ignored. Other Unicode spaces, such as U+00A0, are part of a token.
pub fn parse_edge(line: &str) -> Result<(String, String)> {
    let mut pieces = line.split(is_separator);
    let source = pieces.next().unwrap_or_default();
    match pieces.find(|piece| !piece.is_empty()) {
        Some(target) => Ok((source.to_owned(), target.to_owned())),
        None => Err(Error::MalformedLine {
            line: line.to_owned(),
        }),
    }
}

/// Parses the iteration count argument; it must be a positive integer.
pub fn parse_iterations(arg: &str) -> Result<usize> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidIterationCount(arg.to_owned())),
    }
}

/// Shares `rank` evenly between `neighbors`.
pub fn distribute(neighbors: Vec<String>, rank: f64) -> impl Iterator<Item = (String, f64)> {
    let count = neighbors.len();
    neighbors
        .into_iter()
        .map(move |neighbor| (neighbor, rank / count as f64))
}

pub fn damped_rank(contributions: &[f64]) -> f64 {
    let sum = contributions.iter().fold(0.0, |acc, c| acc + c);
    RESET_PROBABILITY + sum * DAMPING_FACTOR
}

/// Rounds to `places` decimals, ties going toward positive infinity.
///
/// The value is scaled first, so binary representation decides the close
/// cases: `2.345` scales to exactly `234.5` and becomes `2.35`, while `-1.005`
/// scales to just above `-100.5` and becomes `-1.0`.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    let factor = 10_i64.pow(places) as f64;
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    // Saturates like a conversion to a 64 bit integer, NaN becomes zero.
    (rounded as i64) as f64 / factor
}

/// Renders a double the way the JVM prints one: always with a fractional
/// digit, and in `1.0E7` notation outside of `[1e-3, 1e7)`.
pub fn format_rank(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let mut s = format!("{}", value);
        if !s.contains('.') {
            s.push_str(".0");
        }
        return s;
    }
    let s = format!("{:e}", value);
    let (mantissa, exponent) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{}E{}", mantissa, exponent)
    } else {
        format!("{}.0E{}", mantissa, exponent)
    }
}

/// One output line: `<id> has rank: <rank>.`
pub fn render(id: &str, rank: f64) -> String {
    format!(
        "{} has rank: {}.",
        id,
        format_rank(round_half_up(rank, OUTPUT_PLACES))
    )
}

/// Builds the lazy PageRank plan over an RDD of input lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRank {
    iterations: usize,
    partitions: usize,
}

impl PageRank {
    pub fn new(iterations: usize, partitions: usize) -> Result<Self> {
        if iterations == 0 {
            return Err(Error::InvalidIterationCount(iterations.to_string()));
        }
        if partitions == 0 {
            return Err(Error::InvalidPartitionCount);
        }
        Ok(PageRank {
            iterations,
            partitions,
        })
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Distinct edges grouped by source. Hash partitioned, so joining ranks
    /// produced by [`PageRank::update_ranks`] needs no shuffle of this side.
    pub fn links(
        &self,
        lines: &Arc<dyn Rdd<Item = String>>,
    ) -> Arc<dyn Rdd<Item = (String, Vec<String>)>> {
        lines
            .try_map(|line: String| parse_edge(&line))
            .distinct_with_num_partitions(self.partitions)
            .group_by_key(self.partitions)
    }

    /// Rank `1.0` for every identifier that is the target of some edge.
    pub fn initial_ranks(
        &self,
        lines: &Arc<dyn Rdd<Item = String>>,
    ) -> Arc<dyn Rdd<Item = (String, f64)>> {
        lines
            .try_map(|line: String| parse_edge(&line).map(|(_source, target)| target))
            .distinct_with_num_partitions(self.partitions)
            .map(|target: String| (target, 1.0))
    }

    pub fn contributions(
        &self,
        links: &Arc<dyn Rdd<Item = (String, Vec<String>)>>,
        ranks: &Arc<dyn Rdd<Item = (String, f64)>>,
    ) -> Arc<dyn Rdd<Item = (String, f64)>> {
        links
            .join(ranks.clone(), self.partitions)
            .values()
            .flat_map(|(neighbors, rank): (Vec<String>, f64)| {
                Box::new(distribute(neighbors, rank)) as Box<dyn Iterator<Item = (String, f64)>>
            })
    }

    pub fn update_ranks(
        &self,
        contributions: &Arc<dyn Rdd<Item = (String, f64)>>,
    ) -> Arc<dyn Rdd<Item = (String, f64)>> {
        contributions
            .group_by_key(self.partitions)
            .map_values(|cs: Vec<f64>| damped_rank(&cs))
    }

    /// The ranks after all iterations, still unevaluated.
    pub fn ranks(
        &self,
        lines: &Arc<dyn Rdd<Item = String>>,
    ) -> Arc<dyn Rdd<Item = (String, f64)>> {
        // Both tables read the input, and every iteration joins the links.
        let lines = lines.cache();
        let links = self.links(&lines).cache();
        let mut ranks = self.initial_ranks(&lines);
        for iteration in 0..self.iterations {
            log::debug!("planning iteration {} of {}", iteration + 1, self.iterations);
            let contributions = self.contributions(&links, &ranks);
            ranks = self.update_ranks(&contributions);
        }
        ranks
    }

    /// Runs every iteration and collects the final ranks. Order is unspecified.
    pub fn run(&self, lines: &Arc<dyn Rdd<Item = String>>) -> Result<Vec<(String, f64)>> {
        let ranks = self.ranks(lines).collect()?;
        log::info!(
            "pagerank finished {} iterations with {} ranked identifiers",
            self.iterations,
            ranks.len()
        );
        Ok(ranks)
    }
}
