use super::csv_common::export_to_csv;
use super::{ExportError, SurveyRow, SURVEY_LIST_DISPLAY};

pub fn render(rows: &[SurveyRow]) -> Result<String, ExportError> {
    export_to_csv(rows, &SURVEY_LIST_DISPLAY, SurveyRow::values)
}
