//! Excel workbook rendering

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use super::{export_error, row, Cell, COLUMNS};
use crate::model::{Entity, Experiment};
use crate::Result;

const SHEET_NAME: &str = "Experiments";

const HEADERS: [&str; 11] = [
    "ID",
    "Name",
    "Description",
    "Author",
    "Status",
    "Tags",
    "Created At",
    "Updated At",
    "Accuracy",
    "Loss",
    "F1 Score",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
const HEADER_FILL: u32 = 0x0044_72C4;
const BAND_FILL: u32 = 0x00D9_E2F3;
const MAX_COLUMN_WIDTH: u16 = 50;

/// Index of the first timestamp column in [`COLUMNS`].
const CREATED_AT: usize = 6;

pub(super) fn to_xlsx(experiments: &[Experiment]) -> Result<Vec<u8>> {
    debug_assert_eq!(HEADERS.len(), COLUMNS.len());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_sheet(worksheet, experiments)?;
    workbook.save_to_buffer().map_err(export_error)
}

fn write_sheet(worksheet: &mut Worksheet, experiments: &[Experiment]) -> Result<()> {
    worksheet.set_name(SHEET_NAME).map_err(export_error)?;

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let plain = Format::new().set_border(FormatBorder::Thin);
    let banded = plain.clone().set_background_color(Color::RGB(BAND_FILL));

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();

    for (col, title) in (0u16..).zip(HEADERS) {
        worksheet
            .write_string_with_format(0, col, title, &header)
            .map_err(export_error)?;
    }

    for (row_num, experiment) in (1u32..).zip(experiments) {
        // Spreadsheet rows are 1-based; even rows are shaded.
        let format = if row_num % 2 == 1 { &banded } else { &plain };
        for ((col, cell), width) in (0u16..).zip(cells(experiment)).zip(widths.iter_mut()) {
            let written = match &cell {
                Cell::Text(text) => {
                    worksheet.write_string_with_format(row_num, col, text, format)
                }
                Cell::Number(n) => worksheet.write_number_with_format(row_num, col, *n, format),
                Cell::Empty => worksheet.write_blank(row_num, col, format),
            };
            written.map_err(export_error)?;
            *width = (*width).max(cell.text().chars().count());
        }
    }

    for (col, width) in (0u16..).zip(widths) {
        let width = u16::try_from(width + 2)
            .unwrap_or(MAX_COLUMN_WIDTH)
            .min(MAX_COLUMN_WIDTH);
        worksheet
            .set_column_width(col, f64::from(width))
            .map_err(export_error)?;
    }

    worksheet.set_freeze_panes(1, 0).map_err(export_error)?;
    Ok(())
}

/// Tabular row with timestamps shortened to minutes.
fn cells(experiment: &Experiment) -> Vec<Cell> {
    let mut cells = row(experiment);
    cells[CREATED_AT] = Cell::Text(experiment.created_at().format(DATE_FORMAT).to_string());
    cells[CREATED_AT + 1] = Cell::Text(experiment.updated_at().format(DATE_FORMAT).to_string());
    cells
}
