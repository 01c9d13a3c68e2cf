//! PDF layout for invoices.
//!
//! Pages are A4 with the standard Helvetica font, so no font files are
//! embedded. Content streams are left uncompressed. Text is written in
//! `WinAnsiEncoding` (Windows-1252), which covers Latin-1 titles such as
//! "Café"; characters outside it print as `?`.

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::models::Order;

use super::InvoiceError;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;

const TITLE_SIZE: f32 = 26.0;
const LINE_SIZE: f32 = 14.0;
const TOTAL_SIZE: f32 = 20.0;
const LEADING: f32 = 1.5;

/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

/// Render `order` as a complete PDF file.
///
/// Layout, top to bottom: a centred, underlined "Invoice" title, a divider,
/// one `"<title> - <quantity> x $<price>"` line per order line, another
/// divider, and a right-aligned `"Total Price: $<total>"`. Lines that do not
/// fit continue on a new page.
///
/// # Errors
///
/// Returns `InvoiceError::Render` if the document cannot be serialised.
pub fn generate_invoice(order: &Order) -> Result<Vec<u8>, InvoiceError> {
    let mut layout = Layout::new();

    layout.centred_title("Invoice", TITLE_SIZE);
    layout.divider();

    for line in &order.lines {
        let text = format!(
            "{} - {} x {}",
            line.product.title, line.quantity, line.product.price
        );
        layout.text_left(&text, LINE_SIZE);
    }

    layout.divider();
    layout.text_right(&format!("Total Price: {}", order.total()), TOTAL_SIZE);

    layout.finish()
}

/// Encode `text` as Windows-1252, one byte per character.
///
/// Control characters and anything the encoding cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut buf = [0u8; 4];
    text.chars()
        .map(|c| {
            if c.is_control() {
                return b'?';
            }
            let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
            match (unmappable, bytes.as_ref()) {
                (false, [byte]) => *byte,
                _ => b'?',
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn text_width(text: &[u8], size: f32) -> f32 {
    text.len() as f32 * size * GLYPH_WIDTH
}

/// Accumulates drawing operations, breaking pages as the cursor runs out of room.
struct Layout {
    finished: Vec<Vec<Operation>>,
    page: Vec<Operation>,
    y: f32,
}

impl Layout {
    const fn new() -> Self {
        Self {
            finished: Vec::new(),
            page: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Move the cursor down by `height`, starting a new page if needed.
    fn advance(&mut self, height: f32) -> f32 {
        if self.y - height < MARGIN {
            self.finished.push(std::mem::take(&mut self.page));
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= height;
        self.y
    }

    fn text_at(&mut self, x: f32, y: f32, text: &[u8], size: f32) {
        let ops = &mut self.page;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), Object::Real(size)]));
        ops.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(text.to_vec())]));
        ops.push(Operation::new("ET", vec![]));
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32, width: f32) {
        let ops = &mut self.page;
        ops.push(Operation::new("w", vec![Object::Real(width)]));
        ops.push(Operation::new("m", vec![Object::Real(x1), Object::Real(y)]));
        ops.push(Operation::new("l", vec![Object::Real(x2), Object::Real(y)]));
        ops.push(Operation::new("S", vec![]));
    }

    fn centred_title(&mut self, text: &str, size: f32) {
        let text = win_ansi(text);
        let width = text_width(&text, size);
        let x = (PAGE_WIDTH - width) / 2.0;
        let y = self.advance(size * LEADING);
        self.text_at(x, y, &text, size);
        self.rule(x, x + width, y - 3.0, 1.0);
    }

    fn text_left(&mut self, text: &str, size: f32) {
        let y = self.advance(size * LEADING);
        self.text_at(MARGIN, y, &win_ansi(text), size);
    }

    fn text_right(&mut self, text: &str, size: f32) {
        let text = win_ansi(text);
        let x = (PAGE_WIDTH - MARGIN - text_width(&text, size)).max(MARGIN);
        let y = self.advance(size * LEADING);
        self.text_at(x, y, &text, size);
    }

    fn divider(&mut self) {
        let y = self.advance(LINE_SIZE);
        self.rule(MARGIN, PAGE_WIDTH - MARGIN, y + LINE_SIZE / 2.0, 0.5);
    }

    fn finish(mut self) -> Result<Vec<u8>, InvoiceError> {
        self.finished.push(self.page);
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::with_capacity(self.finished.len());
        for operations in self.finished {
            let content = Content { operations }
                .encode()
                .map_err(|e| InvoiceError::Render(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len())
            .map_err(|_| InvoiceError::Render("too many pages".to_owned()))?;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| InvoiceError::Render(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Email, Money, OrderId, ProductId, UserId};
    use chrono::Utc;

    use super::*;
    use crate::models::{OrderLine, OrderedProduct};

    fn order_with(lines: Vec<(&str, &str, u32)>) -> Order {
        Order {
            id: OrderId::new(9),
            user_id: UserId::new(1),
            email: Email::parse("buyer@example.com").unwrap(),
            lines: lines
                .into_iter()
                .enumerate()
                .map(|(i, (title, price, quantity))| OrderLine {
                    product: OrderedProduct {
                        product_id: ProductId::new(i64::try_from(i).unwrap()),
                        title: title.to_owned(),
                        price: Money::parse(price).unwrap(),
                        description: String::new(),
                        image_path: String::new(),
                    },
                    quantity,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        contains_bytes(haystack, needle.as_bytes())
    }

    fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    #[test]
    fn test_invoice_lists_lines_and_total() {
        let order = order_with(vec![("Mug", "4.50", 2), ("Tea", "0.10", 3)]);
        let bytes = generate_invoice(&order).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, "(Invoice)"));
        assert!(contains(&bytes, "Mug - 2 x $4.50"));
        assert!(contains(&bytes, "Tea - 3 x $0.10"));
        assert!(contains(&bytes, "Total Price: $9.30"));
    }

    #[test]
    fn test_invoice_parses_back() {
        let order = order_with(vec![("Mug", "4.50", 1)]);
        let bytes = generate_invoice(&order).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_orders_paginate() {
        let lines: Vec<(&str, &str, u32)> = (0..120).map(|_| ("Sticker", "1.00", 1)).collect();
        let bytes = generate_invoice(&order_with(lines)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 3);
        assert!(contains(&bytes, "Total Price: $120.00"));
    }

    #[test]
    fn test_latin1_titles_survive() {
        let order = order_with(vec![("Crème Brûlée Café", "4.50", 2)]);
        let bytes = generate_invoice(&order).unwrap();

        assert!(contains_bytes(&bytes, b"Cr\xE8me Br\xFBl\xE9e Caf\xE9 - 2 x $4.50"));
        assert!(contains(&bytes, "/WinAnsiEncoding"));
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi("Café"), b"Caf\xE9".to_vec());
        assert_eq!(win_ansi("€5"), b"\x805".to_vec());
        assert_eq!(win_ansi("tea ☕\n"), b"tea ??".to_vec());
        assert_eq!(win_ansi("plain (text)"), b"plain (text)".to_vec());
    }
}
