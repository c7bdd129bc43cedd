//! ESRI Shapefile point layer zipped together with its sidecar files.

use std::io::{Cursor, Write};

use chrono::{Datelike, Utc};
use zip::write::FileOptions;
use zip::ZipWriter;

use super::{ExportError, SurveyRow, LAYER_NAME, SURVEY_LIST_DISPLAY};

const SHAPE_POINT: i32 = 1;
const HEADER_LEN: usize = 100;
/// Record header (8) plus shape type and two coordinates (20).
const POINT_RECORD_LEN: usize = 28;

const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

#[derive(Clone, Copy)]
enum DbfKind {
    Character,
    Numeric { decimals: u8 },
}

struct DbfField {
    name: String,
    kind: DbfKind,
    len: u8,
}

/// dBASE field names are limited to ten characters and character fields
/// to 254 bytes. Longer text is cut on a char boundary with a warning.
fn dbf_fields() -> Vec<DbfField> {
    SURVEY_LIST_DISPLAY
        .iter()
        .map(|column| {
            let (kind, len) = match *column {
                "id" => (DbfKind::Numeric { decimals: 0 }, 10),
                "longitude" | "latitude" => (DbfKind::Numeric { decimals: 12 }, 20),
                "creation_date" | "update_date" => (DbfKind::Character, 32),
                _ => (DbfKind::Character, 254),
            };
            DbfField {
                name: column.chars().take(10).collect(),
                kind,
                len,
            }
        })
        .collect()
}

pub fn render(rows: &[SurveyRow]) -> Result<Vec<u8>, ExportError> {
    let (shp, shx) = write_shp_shx(rows);
    let dbf = write_dbf(rows);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    let files: [(&str, &[u8]); 5] = [
        ("shp", shp.as_slice()),
        ("shx", shx.as_slice()),
        ("dbf", dbf.as_slice()),
        ("prj", WGS84_PRJ.as_bytes()),
        ("cpg", b"UTF-8".as_slice()),
    ];
    for (ext, bytes) in files {
        zip.start_file(format!("{}.{}", LAYER_NAME, ext), options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn write_shp_shx(rows: &[SurveyRow]) -> (Vec<u8>, Vec<u8>) {
    let bbox = rows.iter().fold(None, |acc: Option<[f64; 4]>, row| {
        Some(match acc {
            None => [row.longitude, row.latitude, row.longitude, row.latitude],
            Some(b) => [
                b[0].min(row.longitude),
                b[1].min(row.latitude),
                b[2].max(row.longitude),
                b[3].max(row.latitude),
            ],
        })
    });
    let bbox = bbox.unwrap_or([0.0; 4]);

    let shp_len = HEADER_LEN + POINT_RECORD_LEN * rows.len();
    let shx_len = HEADER_LEN + 8 * rows.len();

    let mut shp = main_header(shp_len, bbox);
    let mut shx = main_header(shx_len, bbox);

    for (index, row) in rows.iter().enumerate() {
        let offset = HEADER_LEN + POINT_RECORD_LEN * index;
        shx.extend_from_slice(&((offset / 2) as i32).to_be_bytes());
        shx.extend_from_slice(&10i32.to_be_bytes());

        shp.extend_from_slice(&(index as i32 + 1).to_be_bytes());
        shp.extend_from_slice(&10i32.to_be_bytes());
        shp.extend_from_slice(&SHAPE_POINT.to_le_bytes());
        shp.extend_from_slice(&row.longitude.to_le_bytes());
        shp.extend_from_slice(&row.latitude.to_le_bytes());
    }

    (shp, shx)
}

/// The 100 byte header shared by `.shp` and `.shx`. Lengths are counted
/// in 16-bit words.
fn main_header(file_len: usize, bbox: [f64; 4]) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&9994i32.to_be_bytes());
    header.extend_from_slice(&[0u8; 20]);
    header.extend_from_slice(&((file_len / 2) as i32).to_be_bytes());
    header.extend_from_slice(&1000i32.to_le_bytes());
    header.extend_from_slice(&SHAPE_POINT.to_le_bytes());
    for value in bbox {
        header.extend_from_slice(&value.to_le_bytes());
    }
    header.extend_from_slice(&[0u8; 32]);
    header
}

fn write_dbf(rows: &[SurveyRow]) -> Vec<u8> {
    let fields = dbf_fields();
    let header_len = 32 + 32 * fields.len() + 1;
    let record_len = 1 + fields.iter().map(|f| f.len as usize).sum::<usize>();
    let today = Utc::now();

    let mut dbf = Vec::with_capacity(header_len + record_len * rows.len() + 1);
    dbf.push(0x03);
    dbf.push((today.year() - 1900) as u8);
    dbf.push(today.month() as u8);
    dbf.push(today.day() as u8);
    dbf.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    dbf.extend_from_slice(&(header_len as u16).to_le_bytes());
    dbf.extend_from_slice(&(record_len as u16).to_le_bytes());
    dbf.extend_from_slice(&[0u8; 20]);

    for field in &fields {
        let mut name = [0u8; 11];
        name[..field.name.len()].copy_from_slice(field.name.as_bytes());
        dbf.extend_from_slice(&name);
        let (kind, decimals) = match field.kind {
            DbfKind::Character => (b'C', 0),
            DbfKind::Numeric { decimals } => (b'N', decimals),
        };
        dbf.push(kind);
        dbf.extend_from_slice(&[0u8; 4]);
        dbf.push(field.len);
        dbf.push(decimals);
        dbf.extend_from_slice(&[0u8; 14]);
    }
    dbf.push(0x0D);

    for row in rows {
        dbf.push(b' ');
        for (field, value) in fields.iter().zip(row.values()) {
            dbf.extend_from_slice(&dbf_value(field, &value, row));
        }
    }
    dbf.push(0x1A);
    dbf
}

fn dbf_value(field: &DbfField, value: &str, row: &SurveyRow) -> Vec<u8> {
    let width = field.len as usize;
    let text = match field.kind {
        DbfKind::Numeric { decimals: 0 } => format!("{:>width$}", value, width = width),
        DbfKind::Numeric { decimals } => {
            let number = if field.name == "longitude" {
                row.longitude
            } else {
                row.latitude
            };
            format!(
                "{:>width$.prec$}",
                number,
                width = width,
                prec = decimals as usize
            )
        }
        DbfKind::Character => {
            let mut text = String::with_capacity(width);
            for ch in value.chars() {
                if text.len() + ch.len_utf8() > width {
                    tracing::warn!(
                        "Shapefile field {} of observation {} truncated from {} to {} bytes",
                        field.name,
                        row.id,
                        value.len(),
                        text.len()
                    );
                    break;
                }
                text.push(ch);
            }
            format!("{:<width$}", text, width = width)
        }
    };

    let mut bytes = text.into_bytes();
    bytes.resize(width, b' ');
    bytes
}
