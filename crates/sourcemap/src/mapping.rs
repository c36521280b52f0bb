use serde::Deserialize;

use crate::error::SourceMapError;

/// Version-3 source map as found on disk / over the wire.
#[derive(Debug, Deserialize)]
struct RawSourceMap {
    #[serde(default)]
    sources: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: Option<String>,
    #[serde(default, rename = "sourceRoot")]
    source_root: Option<String>,
}

/// One decoded mapping segment. All positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: u32,
    /// `None` for single-field segments that map to no source.
    pub source: Option<u32>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

/// A parsed source map: decoded segments grouped by generated line,
/// each line sorted by generated column.
#[derive(Debug, Clone)]
pub struct SourceMap {
    sources: Vec<String>,
    names: Vec<String>,
    lines: Vec<Vec<Segment>>,
}

impl SourceMap {
    /// Parse a v3 source map. `sources` and `mappings` are mandatory.
    pub fn from_slice(data: &[u8]) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_slice(data)?;
        let sources = raw.sources.ok_or(SourceMapError::MissingSources)?;
        let mappings = raw.mappings.ok_or(SourceMapError::MissingMappings)?;

        let root = raw
            .source_root
            .as_deref()
            .map(|r| r.trim_end_matches('/'))
            .filter(|r| !r.is_empty());
        let sources: Vec<String> = sources
            .into_iter()
            .map(|s| {
                let s = s.unwrap_or_default();
                match root {
                    Some(root) if !s.contains("://") && !s.starts_with('/') => {
                        format!("{root}/{s}")
                    }
                    _ => s,
                }
            })
            .collect();

        let lines = decode_mappings(&mappings, sources.len(), raw.names.len())?;
        Ok(Self {
            sources,
            names: raw.names,
            lines,
        })
    }

    pub fn source(&self, segment: &Segment) -> Option<&str> {
        let idx = segment.source? as usize;
        self.sources
            .get(idx)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn name(&self, segment: &Segment) -> Option<&str> {
        let idx = segment.name? as usize;
        self.names.get(idx).map(String::as_str)
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Greatest-lower-bound lookup on a single generated line: the last
    /// segment whose column is `<= column`. Never crosses into another line.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<&Segment> {
        let segments = self.lines.get(line as usize)?;
        let idx = segments.partition_point(|s| s.generated_column <= column);
        idx.checked_sub(1).map(|i| &segments[i])
    }

    /// Closest named segment from `source` within the given window.
    ///
    /// The column radius applies on every line of the window. Segments before
    /// the target win over segments after it; ties are broken by line
    /// distance, then column distance.
    pub fn nearest_named(
        &self,
        source: u32,
        line: u32,
        column: u32,
        line_radius: u32,
        column_radius: u32,
    ) -> Option<&Segment> {
        let first = line.saturating_sub(line_radius) as usize;
        let last = (line.saturating_add(line_radius) as usize).min(self.lines.len().saturating_sub(1));
        if first >= self.lines.len() {
            return None;
        }

        let mut best: Option<((bool, u32, u32), &Segment)> = None;
        for (offset, segments) in self.lines[first..=last].iter().enumerate() {
            let seg_line = (first + offset) as u32;
            for seg in segments {
                if seg.name.is_none() || seg.source != Some(source) {
                    continue;
                }
                let col_dist = seg.generated_column.abs_diff(column);
                if col_dist > column_radius {
                    continue;
                }
                let after =
                    seg_line > line || (seg_line == line && seg.generated_column > column);
                let key = (after, seg_line.abs_diff(line), col_dist);
                if best.is_none_or(|(k, _)| key < k) {
                    best = Some((key, seg));
                }
            }
        }
        best.map(|(_, seg)| seg)
    }
}

fn decode_mappings(
    mappings: &str,
    source_count: usize,
    name_count: usize,
) -> Result<Vec<Vec<Segment>>, SourceMapError> {
    // Source, original line/column and name deltas carry across lines;
    // the generated column resets on every line.
    let mut source: i64 = 0;
    let mut original_line: i64 = 0;
    let mut original_column: i64 = 0;
    let mut name: i64 = 0;

    let mut lines = Vec::new();
    let mut fields = Vec::with_capacity(5);
    for (line_idx, line) in mappings.split(';').enumerate() {
        let mut generated_column: i64 = 0;
        let mut segments = Vec::new();

        for raw in line.split(',').filter(|s| !s.is_empty()) {
            let invalid = |reason| SourceMapError::InvalidMapping {
                line: line_idx,
                reason,
            };
            fields.clear();
            decode_vlq(raw, &mut fields).map_err(invalid)?;

            generated_column += fields[0];
            if generated_column < 0 {
                return Err(invalid("negative generated column"));
            }
            let mut segment = Segment {
                generated_column: to_u32(generated_column).ok_or_else(|| invalid("overflow"))?,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            match fields.len() {
                1 => {}
                4 | 5 => {
                    source += fields[1];
                    original_line += fields[2];
                    original_column += fields[3];
                    if source < 0 || source as usize >= source_count {
                        return Err(invalid("source index out of range"));
                    }
                    segment.source = to_u32(source);
                    segment.original_line =
                        to_u32(original_line).ok_or_else(|| invalid("negative original line"))?;
                    segment.original_column = to_u32(original_column)
                        .ok_or_else(|| invalid("negative original column"))?;
                    if fields.len() == 5 {
                        name += fields[4];
                        if name < 0 || name as usize >= name_count {
                            return Err(invalid("name index out of range"));
                        }
                        segment.name = to_u32(name);
                    }
                }
                _ => return Err(invalid("segment must have 1, 4 or 5 fields")),
            }
            segments.push(segment);
        }

        segments.sort_by_key(|s| s.generated_column);
        lines.push(segments);
    }
    Ok(lines)
}

fn to_u32(v: i64) -> Option<u32> {
    u32::try_from(v).ok()
}

/// Decode one comma-separated segment of base64 VLQ values into `out`.
fn decode_vlq(segment: &str, out: &mut Vec<i64>) -> Result<(), &'static str> {
    let mut value: i64 = 0;
    let mut shift: u32 = 0;
    for byte in segment.bytes() {
        let digit = vlq_digit(byte).ok_or("invalid base64 character")?;
        value |= i64::from(digit & 0b1_1111) << shift;
        if digit & 0b10_0000 != 0 {
            shift += 5;
            if shift > 55 {
                return Err("VLQ value overflows");
            }
        } else {
            let magnitude = value >> 1;
            out.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }
    if shift != 0 {
        return Err("unterminated VLQ value");
    }
    if out.len() > 5 {
        return Err("segment must have 1, 4 or 5 fields");
    }
    Ok(())
}

fn vlq_digit(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}
