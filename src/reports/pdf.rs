use crate::core::{ForecastPoint, QuoteSeries};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;

/// Writes lines top to bottom, starting a new A4 page when the bottom margin
/// is reached.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("Failed to load font: {e:?}"))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("Failed to load font: {e:?}"))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT / 2.0;
    }

    fn save(self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.doc
            .save(&mut writer)
            .map_err(|e| anyhow!("Failed to save PDF: {e:?}"))
    }
}

fn history_line(reference: &str, timestamp: &DateTime<Utc>, bid: f64) -> String {
    format!("{}: {} {:.4}", timestamp.format("%Y-%m-%d"), reference, bid)
}

pub fn write(path: &Path, series: &QuoteSeries, forecast: &[ForecastPoint]) -> Result<()> {
    let title = format!("Quotes {}", series.pair());
    let mut writer = PageWriter::new(&title)?;

    writer.line(&title, 16.0, true);
    writer.gap();

    if let Some(stats) = series.stats() {
        writer.line(
            &format!(
                "Mean: {cur} {:.4}   Min: {cur} {:.4}   Max: {cur} {:.4}",
                stats.mean,
                stats.min,
                stats.max,
                cur = series.reference
            ),
            10.0,
            false,
        );
        writer.gap();
    }

    writer.line("History:", 12.0, true);
    for quote in &series.quotes {
        writer.line(
            &history_line(&series.reference, &quote.timestamp, quote.bid),
            10.0,
            false,
        );
    }

    writer.gap();
    writer.line(&format!("Forecast ({} days):", forecast.len()), 12.0, true);
    for point in forecast {
        writer.line(
            &format!(
                "{}: {} {:.4} (min {:.4}, max {:.4})",
                point.timestamp.format("%Y-%m-%d"),
                series.reference,
                point.bid,
                point.min,
                point.max
            ),
            10.0,
            false,
        );
    }

    writer.save(path)
}
