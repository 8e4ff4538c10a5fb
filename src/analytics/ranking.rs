//! Cross-entity rankings with "min" tie handling.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::{PolicyError, Result};
use crate::frames;
use crate::schema::long;

/// One entity's aggregated value and its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub entity: String,
    pub value: f64,
    pub rank: u32,
}

/// Sum of `value_column` per entity. Missing values are ignored; entities
/// with no value at all are dropped.
pub fn entity_totals(df: &DataFrame, entity_column: &str, value_column: &str) -> Result<Vec<(String, f64)>> {
    frames::require_columns(df, &[entity_column, value_column])?;
    let parsed = frames::parse_float(df.clone(), value_column)?;

    let grouped = parsed
        .lazy()
        .filter(col(entity_column).is_not_null().and(col(value_column).is_not_null()))
        .group_by([col(entity_column)])
        .agg([col(value_column).sum()])
        .collect()?;

    let entities = frames::str_values(&grouped, entity_column)?;
    let values = frames::f64_values(&grouped, value_column)?;
    let mut totals: Vec<(String, f64)> = entities
        .into_iter()
        .zip(values)
        .filter_map(|(e, v)| Some((e?, v?)))
        .collect();
    totals.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(totals)
}

/// Descending rank: 1 + number of entities with a strictly greater value.
/// Output is ordered by rank, then entity name.
pub fn min_rank(values: &[(String, f64)]) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = values
        .iter()
        .map(|(entity, value)| Ranked {
            entity: entity.clone(),
            value: *value,
            rank: 1 + values.iter().filter(|(_, other)| other > value).count() as u32,
        })
        .collect();
    ranked.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.entity.cmp(&b.entity)));
    ranked
}

pub fn rank_entities(df: &DataFrame, entity_column: &str, value_column: &str) -> Result<Vec<Ranked>> {
    Ok(min_rank(&entity_totals(df, entity_column, value_column)?))
}

pub fn ranked_frame(ranked: &[Ranked]) -> Result<DataFrame> {
    let entities: Vec<&str> = ranked.iter().map(|r| r.entity.as_str()).collect();
    let values: Vec<f64> = ranked.iter().map(|r| r.value).collect();
    let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
    Ok(DataFrame::new(vec![
        Column::new(long::ENTITY.into(), &entities),
        Column::new(long::VALUE.into(), &values),
        Column::new(long::RANK.into(), &ranks),
    ])?)
}

/// Rank of `entity` among all entities in the frame.
pub fn country_rank(
    df: &DataFrame,
    entity_column: &str,
    value_column: &str,
    entity: &str,
) -> Result<Option<u32>> {
    Ok(rank_entities(df, entity_column, value_column)?
        .into_iter()
        .find(|r| r.entity == entity)
        .map(|r| r.rank))
}

// ── Long-format (entity, year, value) helpers ───────────────────────────────

fn by_year(long_df: &DataFrame) -> Result<BTreeMap<i64, Vec<(String, f64)>>> {
    frames::require_columns(long_df, &[long::ENTITY, long::YEAR, long::VALUE])?;
    let entities = frames::str_values(long_df, long::ENTITY)?;
    let years = frames::i64_values(long_df, long::YEAR)?;
    let values = frames::f64_values(long_df, long::VALUE)?;

    let mut out: BTreeMap<i64, BTreeMap<String, f64>> = BTreeMap::new();
    for ((entity, year), value) in entities.into_iter().zip(years).zip(values) {
        if let (Some(entity), Some(year), Some(value)) = (entity, year, value) {
            *out.entry(year).or_default().entry(entity).or_insert(0.0) += value;
        }
    }
    Ok(out
        .into_iter()
        .map(|(year, m)| (year, m.into_iter().collect()))
        .collect())
}

/// `(year, rank)` of one entity for every year it has a value.
pub fn ranks_over_time(long_df: &DataFrame, entity: &str) -> Result<DataFrame> {
    let mut years = Vec::new();
    let mut ranks = Vec::new();
    for (year, values) in by_year(long_df)? {
        if let Some(r) = min_rank(&values).into_iter().find(|r| r.entity == entity) {
            years.push(year);
            ranks.push(r.rank);
        }
    }
    Ok(DataFrame::new(vec![
        Column::new(long::YEAR.into(), &years),
        Column::new(long::RANK.into(), &ranks),
    ])?)
}

/// The `n` highest values in `year` (latest year when `None`), ranked.
pub fn top_n(long_df: &DataFrame, year: Option<i64>, n: usize) -> Result<DataFrame> {
    let mut grouped = by_year(long_df)?;
    let selected = match year {
        Some(y) => grouped.remove(&y),
        None => grouped.pop_last().map(|(_, v)| v),
    }
    .ok_or_else(|| PolicyError::NotFound(format!("No values for year {year:?}")))?;

    let ranked: Vec<Ranked> = min_rank(&selected).into_iter().take(n).collect();
    ranked_frame(&ranked)
}

/// Entities with the largest value increase between the first and last
/// year of the frame.
pub fn top_improvers(long_df: &DataFrame, n: usize) -> Result<DataFrame> {
    let grouped = by_year(long_df)?;
    let (Some((_, start)), Some((_, end))) = (grouped.first_key_value(), grouped.last_key_value()) else {
        return Err(PolicyError::InvalidData("No yearly values to compare".into()));
    };
    let start: BTreeMap<&str, f64> = start.iter().map(|(e, v)| (e.as_str(), *v)).collect();

    let mut deltas: Vec<(&str, f64)> = end
        .iter()
        .filter_map(|(e, v)| Some((e.as_str(), v - start.get(e.as_str())?)))
        .collect();
    deltas.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    deltas.truncate(n);

    let (entities, values): (Vec<&str>, Vec<f64>) = deltas.into_iter().unzip();
    Ok(DataFrame::new(vec![
        Column::new(long::ENTITY.into(), &entities),
        Column::new(long::DELTA.into(), &values),
    ])?)
}

/// Percent change per entity between two years. Entities missing either
/// year, or with a zero start value, are dropped.
pub fn change_between(long_df: &DataFrame, start_year: i64, end_year: i64) -> Result<DataFrame> {
    let grouped = by_year(long_df)?;
    let empty = Vec::new();
    let start: BTreeMap<&str, f64> = grouped
        .get(&start_year)
        .unwrap_or(&empty)
        .iter()
        .map(|(e, v)| (e.as_str(), *v))
        .collect();

    let mut entities = Vec::new();
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    let mut changes = Vec::new();
    for (entity, end) in grouped.get(&end_year).unwrap_or(&empty) {
        let Some(&begin) = start.get(entity.as_str()) else {
            continue;
        };
        if begin == 0.0 {
            continue;
        }
        entities.push(entity.clone());
        starts.push(begin);
        ends.push(*end);
        changes.push((end - begin) / begin * 100.0);
    }

    Ok(DataFrame::new(vec![
        Column::new(long::ENTITY.into(), &entities),
        Column::new(long::START_VALUE.into(), &starts),
        Column::new(long::END_VALUE.into(), &ends),
        Column::new(long::CHANGE_PCT.into(), &changes),
    ])?)
}
