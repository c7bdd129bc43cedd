use indexmap::IndexMap;
use serde_json::{json, Value};

use super::{ExportError, SurveyRow, SURVEY_LIST_DISPLAY};

/// A `FeatureCollection` of `Point [longitude, latitude]` features.
pub fn render(rows: &[SurveyRow]) -> Result<String, ExportError> {
    let features: Vec<Value> = rows
        .iter()
        .map(|row| {
            let properties: IndexMap<&str, Value> = SURVEY_LIST_DISPLAY
                .iter()
                .copied()
                .zip(row.json_values())
                .collect();

            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [row.longitude, row.latitude],
                },
                "properties": properties,
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "crs": {
            "type": "name",
            "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" },
        },
        "features": features,
    });

    Ok(serde_json::to_string(&collection)?)
}
