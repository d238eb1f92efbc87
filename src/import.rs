use std::{collections::HashSet, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::{
    actions::{ingredients::insert_ingredient, tags::insert_tag},
    constants::NAME_MAX_LENGTH,
    error::ApiError,
    validators::{is_valid_color, is_valid_slug},
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Import failed: {0}")]
    Database(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub color: Option<String>,
    pub slug: String,
}

#[derive(Debug)]
pub struct Parsed<T> {
    pub records: Vec<(u64, T)>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: vec![],
            skipped: vec![],
        }
    }
}

impl<T> Parsed<T> {
    fn skip(&mut self, line: u64, reason: impl Into<String>) {
        self.skipped.push(SkippedRow {
            line,
            reason: reason.into(),
        });
    }
}

fn read_records<R: Read>(input: R) -> impl Iterator<Item = (u64, Result<StringRecord, csv::Error>)> {
    ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
        .into_records()
        .enumerate()
        .map(|(index, record)| (index as u64 + 1, record))
}

fn check_text(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err(format!("{field} is empty"))
    } else if value.chars().count() > NAME_MAX_LENGTH {
        Err(format!("{field} is longer than {NAME_MAX_LENGTH} characters"))
    } else {
        Ok(())
    }
}

pub fn parse_ingredients<R: Read>(input: R) -> Parsed<IngredientRecord> {
    let mut parsed = Parsed::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for (line, record) in read_records(input) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.skip(line, format!("unreadable row: {e}"));
                continue;
            }
        };
        if record.len() != 2 {
            parsed.skip(line, format!("expected 2 columns, found {}", record.len()));
            continue;
        }

        let name = &record[0];
        let measurement_unit = &record[1];
        if let Err(reason) =
            check_text("name", name).and_then(|_| check_text("measurement unit", measurement_unit))
        {
            parsed.skip(line, reason);
            continue;
        }
        if !seen.insert((name.to_string(), measurement_unit.to_string())) {
            parsed.skip(line, "duplicate of an earlier row");
            continue;
        }

        parsed.records.push((
            line,
            IngredientRecord {
                name: name.to_string(),
                measurement_unit: measurement_unit.to_string(),
            },
        ));
    }

    parsed
}

pub fn parse_tags<R: Read>(input: R) -> Parsed<TagRecord> {
    let mut parsed = Parsed::default();
    let mut names: HashSet<String> = HashSet::new();
    let mut slugs: HashSet<String> = HashSet::new();

    for (line, record) in read_records(input) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.skip(line, format!("unreadable row: {e}"));
                continue;
            }
        };
        if record.len() != 3 {
            parsed.skip(line, format!("expected 3 columns, found {}", record.len()));
            continue;
        }

        let (name, color, slug) = (&record[0], &record[1], &record[2]);
        if let Err(reason) = check_text("name", name).and_then(|_| check_text("slug", slug)) {
            parsed.skip(line, reason);
            continue;
        }
        if !color.is_empty() && !is_valid_color(color) {
            parsed.skip(line, format!("invalid color {color:?}"));
            continue;
        }
        if !is_valid_slug(slug) {
            parsed.skip(line, format!("invalid slug {slug:?}"));
            continue;
        }
        if names.contains(name) || slugs.contains(slug) {
            parsed.skip(line, "duplicate of an earlier row");
            continue;
        }
        names.insert(name.to_string());
        slugs.insert(slug.to_string());

        parsed.records.push((
            line,
            TagRecord {
                name: name.to_string(),
                color: (!color.is_empty()).then(|| color.to_string()),
                slug: slug.to_string(),
            },
        ));
    }

    parsed
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ImportError> {
    tokio::fs::read(path).await.map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Rows the database refuses are reported like any other bad row. Only
/// connection level failures end the run.
fn skip_rejected<T>(
    inserted: Result<Option<T>, ApiError>,
    line: u64,
    report: &mut ImportReport,
) -> Result<(), ImportError> {
    match inserted {
        Ok(Some(_)) => report.inserted += 1,
        Ok(None) => report.skipped.push(SkippedRow {
            line,
            reason: String::from("already exists"),
        }),
        Err(e @ (ApiError::Validation(_) | ApiError::InvalidRequest(_))) => {
            report.skipped.push(SkippedRow {
                line,
                reason: e.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn finish(kind: &str, path: &Path, report: ImportReport) -> ImportReport {
    for row in &report.skipped {
        log::warn!("{}:{} skipped: {}", path.display(), row.line, row.reason);
    }
    log::info!(
        "Imported {} {kind} from {} ({} skipped)",
        report.inserted,
        path.display(),
        report.skipped.len()
    );
    report
}

pub async fn import_ingredients(
    path: &Path,
    pool: &Pool<Postgres>,
) -> Result<ImportReport, ImportError> {
    let parsed = parse_ingredients(read_file(path).await?.as_slice());
    let mut report = ImportReport {
        inserted: 0,
        skipped: parsed.skipped,
    };

    for (line, record) in parsed.records {
        let inserted = insert_ingredient(&record.name, &record.measurement_unit, pool).await;
        skip_rejected(inserted, line, &mut report)?;
    }

    report.skipped.sort_by_key(|row| row.line);
    Ok(finish("ingredients", path, report))
}

pub async fn import_tags(path: &Path, pool: &Pool<Postgres>) -> Result<ImportReport, ImportError> {
    let parsed = parse_tags(read_file(path).await?.as_slice());
    let mut report = ImportReport {
        inserted: 0,
        skipped: parsed.skipped,
    };

    for (line, record) in parsed.records {
        let inserted = insert_tag(&record.name, record.color.as_deref(), &record.slug, pool).await;
        skip_rejected(inserted, line, &mut report)?;
    }

    report.skipped.sort_by_key(|row| row.line);
    Ok(finish("tags", path, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredients_are_trimmed_and_deduplicated() {
        let input = "абрикосовое варенье, г\nмука,г\n  мука , г \nсоль,щепотка\n";
        let parsed = parse_ingredients(input.as_bytes());

        let names: Vec<(&str, &str)> = parsed
            .records
            .iter()
            .map(|(_, r)| (r.name.as_str(), r.measurement_unit.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("абрикосовое варенье", "г"),
                ("мука", "г"),
                ("соль", "щепотка")
            ]
        );
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 3);
    }

    #[test]
    fn malformed_ingredient_rows_are_reported() {
        let input = "мука\nсахар,г,лишнее\n,г\nмасло,\nяйцо,шт\n";
        let parsed = parse_ingredients(input.as_bytes());

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].0, 5);
        let lines: Vec<u64> = parsed.skipped.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn same_name_with_another_unit_is_kept() {
        let input = "Сахар,г\nСахар,щепотка\nсахар,г\n";
        let parsed = parse_ingredients(input.as_bytes());

        let units: Vec<(&str, &str)> = parsed
            .records
            .iter()
            .map(|(_, r)| (r.name.as_str(), r.measurement_unit.as_str()))
            .collect();
        assert_eq!(
            units,
            vec![("Сахар", "г"), ("Сахар", "щепотка"), ("сахар", "г")]
        );
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn overlong_units_and_slugs_are_skipped() {
        let unit = "г".repeat(NAME_MAX_LENGTH + 1);
        let parsed = parse_ingredients(format!("мука,{unit}\nсоль,г\n").as_bytes());
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].1.name, "соль");
        assert_eq!(parsed.skipped[0].line, 1);
        assert!(parsed.skipped[0].reason.starts_with("measurement unit is longer"));

        let slug = "a".repeat(NAME_MAX_LENGTH + 1);
        let parsed = parse_tags(format!("Ужин,#49B64E,{slug}\nОбед,,lunch\n").as_bytes());
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.skipped[0].reason.starts_with("slug is longer"));
    }

    #[test]
    fn database_rejections_become_skipped_rows() {
        let mut report = ImportReport::default();
        skip_rejected(Ok(Some(1)), 1, &mut report).unwrap();
        skip_rejected::<i32>(Ok(None), 2, &mut report).unwrap();
        skip_rejected::<i32>(
            Err(ApiError::InvalidRequest(String::from("Tag slug is invalid."))),
            3,
            &mut report,
        )
        .unwrap();

        assert_eq!(report.inserted, 1);
        let lines: Vec<u64> = report.skipped.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![2, 3]);

        let failure =
            skip_rejected::<i32>(Err(ApiError::Internal(String::from("down"))), 4, &mut report);
        assert!(matches!(failure, Err(ImportError::Database(_))));
    }

    #[test]
    fn tags_validate_color_and_slug() {
        let input = "Завтрак,#E26C2D,breakfast\nОбед,orange,lunch\nУжин,#49B64E,ужин\nДесерт,,dessert\nBrunch,#fff,breakfast\n";
        let parsed = parse_tags(input.as_bytes());

        let slugs: Vec<&str> = parsed.records.iter().map(|(_, r)| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["breakfast", "dessert"]);
        assert_eq!(parsed.records[1].1.color, None);

        let reasons: Vec<&str> = parsed.skipped.iter().map(|row| row.reason.as_str()).collect();
        assert!(reasons[0].starts_with("invalid color"));
        assert!(reasons[1].starts_with("invalid slug"));
        assert_eq!(reasons[2], "duplicate of an earlier row");
    }
}
