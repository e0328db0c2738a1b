//! Operator walker.
//!
//! Replays a page's decoded content operators through the graphics-state
//! machine and assembles word-level spans in reading order, along with
//! rectangle fills and image placements for the renderer.
//!
//! Structural decomposition: a block is one BT..ET text object that shows
//! at least one word; a line advances when the baseline moves within a
//! block (Td/TD with a vertical component, T*, ', ", or a Tm that changes
//! the translation y); words split on whitespace and on repositioning
//! operators. Kerning adjustments inside a TJ array never split a word.

use lopdf::content::Operation;
use lopdf::Object;

use super::fonts::FontTable;
use super::graphics_state::{GraphicsStateStack, Matrix};
use super::{name_bytes, number, operand_number};
use crate::color::Color;
use crate::elements::text::SpanOrigin;
use crate::elements::FontFlags;
use crate::geometry::{Point, Rect};

/// One assembled word-level span, still in page-walk form.
#[derive(Debug, Clone)]
pub(crate) struct WordSpan {
    pub text: String,
    pub bbox: Rect,
    pub font_name: String,
    pub font_size: f32,
    pub flags: FontFlags,
    pub color: Color,
    pub block: usize,
    pub line: usize,
    pub word: usize,
    pub origin: SpanOrigin,
}

/// A filled rectangle in page space.
#[derive(Debug, Clone)]
pub(crate) struct RectFill {
    pub rect: Rect,
    pub color: Color,
}

/// Everything a single page walk produces.
#[derive(Debug, Default)]
pub(crate) struct PageWalk {
    pub words: Vec<WordSpan>,
    pub fills: Vec<RectFill>,
    /// First placement rectangle per XObject name, in order of first use.
    pub placements: Vec<(Vec<u8>, Rect)>,
}

impl PageWalk {
    /// Placement rect of an XObject by resource name.
    pub fn placement_for(&self, name: &[u8]) -> Option<Rect> {
        self.placements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rect)| *rect)
    }
}

/// Replay one page's operators into spans, fills and placements.
pub(crate) fn walk_page(operations: &[Operation], fonts: &FontTable) -> PageWalk {
    let mut walker = Walker::new();

    for (op_index, op) in operations.iter().enumerate() {
        match op.operator.as_str() {
            "q" => {
                walker.flush();
                walker.states.save();
            }
            "Q" => {
                walker.flush();
                walker.states.restore();
            }
            "cm" => {
                walker.flush();
                let m = matrix_operand(&op.operands);
                let ctm = walker.states.current().ctm;
                walker.states.current_mut().ctm = m.multiply(&ctm);
            }
            "BT" => {
                walker.flush();
                walker.tm = Matrix::identity();
                walker.tlm = Matrix::identity();
                walker.cur_block = None;
                walker.pending_break = false;
            }
            "ET" => walker.flush(),
            "Tf" => {
                walker.flush();
                let name = op
                    .operands
                    .first()
                    .and_then(name_bytes)
                    .map(|n| n.to_vec())
                    .unwrap_or_default();
                let size = operand_number(&op.operands, 1, 12.0) as f32;
                walker.states.current_mut().font = Some((name, size));
            }
            "Td" => {
                let tx = operand_number(&op.operands, 0, 0.0) as f32;
                let ty = operand_number(&op.operands, 1, 0.0) as f32;
                walker.offset_line(tx, ty);
            }
            "TD" => {
                let tx = operand_number(&op.operands, 0, 0.0) as f32;
                let ty = operand_number(&op.operands, 1, 0.0) as f32;
                walker.states.current_mut().leading = -ty;
                walker.offset_line(tx, ty);
            }
            "Tm" => {
                walker.flush();
                let m = matrix_operand(&op.operands);
                if (m.f - walker.tm.f).abs() > 1e-3 {
                    walker.pending_break = true;
                }
                walker.tlm = m;
                walker.tm = m;
            }
            "T*" => walker.next_line(),
            "TL" => {
                walker.states.current_mut().leading = operand_number(&op.operands, 0, 0.0) as f32;
            }
            "Tc" => {
                walker.flush();
                walker.states.current_mut().char_space =
                    operand_number(&op.operands, 0, 0.0) as f32;
            }
            "Tw" => {
                walker.flush();
                walker.states.current_mut().word_space =
                    operand_number(&op.operands, 0, 0.0) as f32;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    walker.show(fonts, op_index, 0, bytes);
                }
            }
            "'" => {
                walker.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    walker.show(fonts, op_index, 0, bytes);
                }
            }
            "\"" => {
                walker.flush();
                walker.states.current_mut().word_space =
                    operand_number(&op.operands, 0, 0.0) as f32;
                walker.states.current_mut().char_space =
                    operand_number(&op.operands, 1, 0.0) as f32;
                walker.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    walker.show(fonts, op_index, 0, bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for (seg, item) in items.iter().enumerate() {
                        match item {
                            Object::String(bytes, _) => walker.show(fonts, op_index, seg, bytes),
                            other => {
                                if let Some(n) = number(other) {
                                    let tf_size = walker.states.current().tf_size();
                                    walker.advance_pen(-(n as f32) / 1000.0 * tf_size);
                                }
                            }
                        }
                    }
                }
            }
            "rg" => {
                walker.flush();
                walker.states.current_mut().fill_color = Color::from_fractions(
                    operand_number(&op.operands, 0, 0.0) as f32,
                    operand_number(&op.operands, 1, 0.0) as f32,
                    operand_number(&op.operands, 2, 0.0) as f32,
                );
            }
            "g" => {
                walker.flush();
                let v = operand_number(&op.operands, 0, 0.0) as f32;
                walker.states.current_mut().fill_color = Color::from_fractions(v, v, v);
            }
            "k" => {
                walker.flush();
                walker.states.current_mut().fill_color = cmyk_color(&op.operands);
            }
            "sc" | "scn" => {
                walker.flush();
                let numeric: Vec<f64> = op.operands.iter().filter_map(number).collect();
                match numeric.len() {
                    1 => {
                        let v = numeric[0] as f32;
                        walker.states.current_mut().fill_color = Color::from_fractions(v, v, v);
                    }
                    3 => {
                        walker.states.current_mut().fill_color = Color::from_fractions(
                            numeric[0] as f32,
                            numeric[1] as f32,
                            numeric[2] as f32,
                        );
                    }
                    4 => {
                        walker.states.current_mut().fill_color = cmyk_color(&op.operands);
                    }
                    _ => {}
                }
            }
            "re" => {
                let x = operand_number(&op.operands, 0, 0.0) as f32;
                let y = operand_number(&op.operands, 1, 0.0) as f32;
                let w = operand_number(&op.operands, 2, 0.0) as f32;
                let h = operand_number(&op.operands, 3, 0.0) as f32;
                let ctm = walker.states.current().ctm;
                walker
                    .pending_rects
                    .push(transformed_bbox(&ctm, x, y, x + w, y + h));
            }
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                let color = walker.states.current().fill_color;
                for rect in walker.pending_rects.drain(..) {
                    walker.out.fills.push(RectFill { rect, color });
                }
            }
            "n" | "S" | "s" => walker.pending_rects.clear(),
            "Do" => {
                if let Some(name) = op.operands.first().and_then(name_bytes) {
                    if walker.out.placement_for(name).is_none() {
                        let ctm = walker.states.current().ctm;
                        let rect = transformed_bbox(&ctm, 0.0, 0.0, 1.0, 1.0);
                        walker.out.placements.push((name.to_vec(), rect));
                    }
                }
            }
            _ => {}
        }
    }

    walker.flush();
    walker.out
}

struct WordBuf {
    text: String,
    start: Point,
    block: usize,
    line: usize,
    word: usize,
    size_eff: f32,
    font_name: String,
    flags: FontFlags,
    color: Color,
    origin: SpanOrigin,
}

struct Walker {
    states: GraphicsStateStack,
    tm: Matrix,
    tlm: Matrix,
    out: PageWalk,
    next_block: usize,
    cur_block: Option<usize>,
    cur_line: usize,
    next_word: usize,
    pending_break: bool,
    word: Option<WordBuf>,
    pending_rects: Vec<Rect>,
}

impl Walker {
    fn new() -> Self {
        Self {
            states: GraphicsStateStack::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            out: PageWalk::default(),
            next_block: 0,
            cur_block: None,
            cur_line: 0,
            next_word: 0,
            pending_break: false,
            word: None,
            pending_rects: Vec::new(),
        }
    }

    fn trm_point(&self) -> Point {
        self.tm
            .multiply(&self.states.current().ctm)
            .transform_point(0.0, 0.0)
    }

    /// Td/TD: translate the line matrix; a vertical component starts a new
    /// line.
    fn offset_line(&mut self, tx: f32, ty: f32) {
        self.flush();
        if ty.abs() > 1e-6 {
            self.pending_break = true;
        }
        self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    /// T* and the leading-advance part of ' and ".
    fn next_line(&mut self) {
        self.flush();
        self.pending_break = true;
        let leading = self.states.current().leading;
        self.tlm = Matrix::translation(0.0, -leading).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn advance_pen(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
    }

    fn show(&mut self, fonts: &FontTable, op_index: usize, seg: usize, bytes: &[u8]) {
        let (res_font, tf_size, char_space, word_space, color) = {
            let gs = self.states.current();
            (
                gs.font
                    .as_ref()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default(),
                gs.tf_size(),
                gs.char_space,
                gs.word_space,
                gs.fill_color,
            )
        };
        let info = fonts.get(&res_font).clone();

        for (i, &b) in bytes.iter().enumerate() {
            let mut advance = (info.width_em(b) * tf_size as f64) as f32 + char_space;
            if is_separator(b) {
                advance += word_space;
                self.flush();
            } else {
                if self.word.is_none() {
                    self.start_word(
                        op_index,
                        seg,
                        i,
                        &info.base_font,
                        info.flags,
                        res_font.clone(),
                        tf_size,
                        char_space,
                        word_space,
                        color,
                    );
                }
                let word = self.word.as_mut().expect("word just started");
                word.text.push(b as char);
                if word.origin.op_index != op_index {
                    word.origin.spans_operators = true;
                }
                word.origin.end_seg = seg;
                word.origin.end_byte = i + 1;
            }
            self.advance_pen(advance);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn start_word(
        &mut self,
        op_index: usize,
        seg: usize,
        byte: usize,
        base_font: &str,
        flags: FontFlags,
        res_font: Vec<u8>,
        tf_size: f32,
        char_space: f32,
        word_space: f32,
        color: Color,
    ) {
        let block = match self.cur_block {
            None => {
                let b = self.next_block;
                self.cur_block = Some(b);
                self.next_block += 1;
                self.cur_line = 0;
                self.next_word = 0;
                self.pending_break = false;
                b
            }
            Some(b) => {
                if self.pending_break {
                    self.cur_line += 1;
                    self.next_word = 0;
                    self.pending_break = false;
                }
                b
            }
        };

        let trm = self.tm.multiply(&self.states.current().ctm);
        self.word = Some(WordBuf {
            text: String::new(),
            start: trm.transform_point(0.0, 0.0),
            block,
            line: self.cur_line,
            word: self.next_word,
            size_eff: tf_size * trm.vertical_scale(),
            font_name: base_font.to_string(),
            flags,
            color,
            origin: SpanOrigin {
                op_index,
                start_seg: seg,
                start_byte: byte,
                end_seg: seg,
                end_byte: byte + 1,
                spans_operators: false,
                res_font,
                tf_size,
                char_space,
                word_space,
            },
        });
    }

    fn flush(&mut self) {
        if let Some(word) = self.word.take() {
            let end = self.trm_point();
            let size = word.size_eff.max(0.1);
            let bbox = Rect::new(
                word.start.x.min(end.x),
                word.start.y.min(end.y) - SpanOrigin::DESCENT_RATIO * size,
                word.start.x.max(end.x),
                word.start.y.max(end.y) + SpanOrigin::ASCENT_RATIO * size,
            );
            self.out.words.push(WordSpan {
                text: word.text,
                bbox,
                font_name: word.font_name,
                font_size: size,
                flags: word.flags,
                color: word.color,
                block: word.block,
                line: word.line,
                word: word.word,
                origin: word.origin,
            });
            self.next_word += 1;
        }
    }
}

fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0C)
}

fn matrix_operand(operands: &[Object]) -> Matrix {
    Matrix::from_operands(
        operand_number(operands, 0, 1.0) as f32,
        operand_number(operands, 1, 0.0) as f32,
        operand_number(operands, 2, 0.0) as f32,
        operand_number(operands, 3, 1.0) as f32,
        operand_number(operands, 4, 0.0) as f32,
        operand_number(operands, 5, 0.0) as f32,
    )
}

fn cmyk_color(operands: &[Object]) -> Color {
    let c = operand_number(operands, 0, 0.0) as f32;
    let m = operand_number(operands, 1, 0.0) as f32;
    let y = operand_number(operands, 2, 0.0) as f32;
    let k = operand_number(operands, 3, 0.0) as f32;
    Color::from_fractions((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
}

/// Axis-aligned bbox of a transformed rectangle.
fn transformed_bbox(m: &Matrix, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
    let corners = [
        m.transform_point(x0, y0),
        m.transform_point(x1, y0),
        m.transform_point(x0, y1),
        m.transform_point(x1, y1),
    ];
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for p in corners {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rect::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn ops(descr: &[(&str, Vec<Object>)]) -> Vec<Operation> {
        descr
            .iter()
            .map(|(name, operands)| Operation::new(name, operands.clone()))
            .collect()
    }

    fn text_ops(text: &str) -> Vec<Operation> {
        ops(&[
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 12.into()]),
            ("Td", vec![72.into(), 720.into()]),
            ("Tj", vec![Object::string_literal(text)]),
            ("ET", vec![]),
        ])
    }

    #[test]
    fn test_words_split_on_whitespace() {
        let walk = walk_page(&text_ops("Hello World"), &FontTable::default());
        assert_eq!(walk.words.len(), 2);
        assert_eq!(walk.words[0].text, "Hello");
        assert_eq!(walk.words[1].text, "World");
        assert_eq!(walk.words[0].word, 0);
        assert_eq!(walk.words[1].word, 1);
        assert_eq!(walk.words[0].line, walk.words[1].line);
    }

    #[test]
    fn test_line_advance_on_vertical_td() {
        let operations = ops(&[
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 12.into()]),
            ("Td", vec![72.into(), 720.into()]),
            ("Tj", vec![Object::string_literal("one")]),
            ("Td", vec![0.into(), Object::Integer(-14)]),
            ("Tj", vec![Object::string_literal("two")]),
            ("ET", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.words.len(), 2);
        assert_eq!(walk.words[0].line, 0);
        assert_eq!(walk.words[1].line, 1);
        assert_eq!(walk.words[1].word, 0);
        assert!(walk.words[1].bbox.y0 < walk.words[0].bbox.y0);
    }

    #[test]
    fn test_blocks_follow_text_objects() {
        let mut operations = text_ops("first");
        operations.extend(text_ops("second"));
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.words[0].block, 0);
        assert_eq!(walk.words[1].block, 1);
    }

    #[test]
    fn test_kerning_does_not_split_words() {
        let operations = ops(&[
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 12.into()]),
            ("Td", vec![72.into(), 720.into()]),
            (
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Ta"),
                    Object::Integer(-120),
                    Object::string_literal("ble"),
                ])],
            ),
            ("ET", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.words.len(), 1);
        assert_eq!(walk.words[0].text, "Table");
    }

    #[test]
    fn test_word_positions_advance() {
        let walk = walk_page(&text_ops("ab cd"), &FontTable::default());
        // Fallback width 0.5 em at 12pt: each glyph advances 6pt.
        let first = walk.words[0].bbox;
        let second = walk.words[1].bbox;
        assert!((first.x0 - 72.0).abs() < 1e-3);
        assert!((first.x1 - 84.0).abs() < 1e-3);
        assert!((second.x0 - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_fill_color_tracked() {
        let operations = ops(&[
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 12.into()]),
            (
                "rg",
                vec![Object::Real(1.0), Object::Real(0.0), Object::Real(0.0)],
            ),
            ("Td", vec![72.into(), 720.into()]),
            ("Tj", vec![Object::string_literal("red")]),
            ("ET", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.words[0].color, Color::new(255, 0, 0));
    }

    #[test]
    fn test_rect_fills_collected() {
        let operations = ops(&[
            (
                "rg",
                vec![Object::Real(0.0), Object::Real(0.0), Object::Real(1.0)],
            ),
            (
                "re",
                vec![10.into(), 20.into(), 100.into(), 50.into()],
            ),
            ("f", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.fills.len(), 1);
        assert_eq!(walk.fills[0].rect.corners(), (10.0, 20.0, 110.0, 70.0));
        assert_eq!(walk.fills[0].color, Color::new(0, 0, 255));
    }

    #[test]
    fn test_image_placement_first_use() {
        let operations = ops(&[
            ("q", vec![]),
            (
                "cm",
                vec![
                    200.into(),
                    0.into(),
                    0.into(),
                    100.into(),
                    50.into(),
                    300.into(),
                ],
            ),
            ("Do", vec!["Im0".into()]),
            ("Q", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        let rect = walk.placement_for(b"Im0").expect("placement recorded");
        assert_eq!(rect.corners(), (50.0, 300.0, 250.0, 400.0));
    }

    #[test]
    fn test_provenance_single_operator() {
        let walk = walk_page(&text_ops("Hello World"), &FontTable::default());
        let origin = &walk.words[1].origin;
        assert_eq!(origin.op_index, 3);
        assert!(!origin.spans_operators);
        assert_eq!(origin.start_byte, 6);
        assert_eq!(origin.end_byte, 11);
    }

    #[test]
    fn test_word_spanning_operators_flagged() {
        let operations = ops(&[
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 12.into()]),
            ("Td", vec![72.into(), 720.into()]),
            ("Tj", vec![Object::string_literal("Hel")]),
            ("Tj", vec![Object::string_literal("lo")]),
            ("ET", vec![]),
        ]);
        let walk = walk_page(&operations, &FontTable::default());
        assert_eq!(walk.words.len(), 1);
        assert_eq!(walk.words[0].text, "Hello");
        assert!(walk.words[0].origin.spans_operators);
    }
}
