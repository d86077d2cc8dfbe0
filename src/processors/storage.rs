// cvcli/src/processors/storage.rs
//! Structured-file persistence of `Mat`s in the `opencv-matrix` layout.
//!
//! A stored matrix is a named node carrying `rows`, `cols`, `dt` and `data`.
//! `dt` is one element letter (`u c w s i f d`), prefixed with the channel count
//! when there is more than one channel. `data` is row-major without padding.
use crate::core::{element_count, CvToolError, ElementEncoding, Mat, PixelBuffer, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const TYPE_ID: &str = "opencv-matrix";
const XML_ROOT: &str = "opencv_storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Json,
    Xml,
}

impl StorageFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = crate::utils::get_file_extension(path);
        match extension.as_deref() {
            Some("json") => Ok(StorageFormat::Json),
            Some("xml") => Ok(StorageFormat::Xml),
            Some("yml") | Some("yaml") => Err(CvToolError::UnsupportedFormat(format!(
                "YAML storage is not supported: {}",
                path.display()
            ))),
            _ => Err(CvToolError::UnsupportedFormat(format!(
                "Cannot infer storage format of {}",
                path.display()
            ))),
        }
    }
}

fn dt_letter(encoding: ElementEncoding) -> Option<char> {
    match encoding {
        ElementEncoding::UInt8 => Some('u'),
        ElementEncoding::Int8 => Some('c'),
        ElementEncoding::UInt16 => Some('w'),
        ElementEncoding::Int16 => Some('s'),
        ElementEncoding::Int32 => Some('i'),
        ElementEncoding::Float32 => Some('f'),
        ElementEncoding::Float64 => Some('d'),
        ElementEncoding::Unrecognized => None,
    }
}

pub fn format_dt(encoding: ElementEncoding, channels: u32) -> Result<String> {
    let letter = dt_letter(encoding).ok_or_else(|| {
        CvToolError::UnsupportedDepth(format!("No storage code for {}", encoding.label()))
    })?;
    if channels > 1 {
        Ok(format!("{}{}", channels, letter))
    } else {
        Ok(letter.to_string())
    }
}

pub fn parse_dt(dt: &str) -> Result<(ElementEncoding, u32)> {
    let invalid = || CvToolError::Storage(format!("Invalid dt '{}'", dt));
    let dt = dt.trim();
    let split = dt.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
    let (count, letter) = dt.split_at(split);

    let channels = if count.is_empty() {
        1
    } else {
        count.parse::<u32>().map_err(|_| invalid())?
    };

    let encoding = match letter {
        "u" => ElementEncoding::UInt8,
        "c" => ElementEncoding::Int8,
        "w" => ElementEncoding::UInt16,
        "s" => ElementEncoding::Int16,
        "i" => ElementEncoding::Int32,
        "f" => ElementEncoding::Float32,
        "d" => ElementEncoding::Float64,
        _ => return Err(invalid()),
    };

    Ok((encoding, channels))
}

fn format_value(value: f64, encoding: ElementEncoding) -> String {
    if value.is_nan() {
        ".Nan".to_string()
    } else if value == f64::INFINITY {
        ".Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-.Inf".to_string()
    } else if matches!(encoding, ElementEncoding::Float32 | ElementEncoding::Float64) {
        format!("{:?}", value)
    } else {
        format!("{}", value as i64)
    }
}

fn parse_value(token: &str) -> Result<f64> {
    match token {
        ".Nan" | ".nan" => Ok(f64::NAN),
        ".Inf" | ".inf" => Ok(f64::INFINITY),
        "-.Inf" | "-.inf" => Ok(f64::NEG_INFINITY),
        _ => token
            .parse::<f64>()
            .map_err(|_| CvToolError::Storage(format!("Invalid element '{}'", token))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonMatrix {
    type_id: String,
    rows: usize,
    cols: usize,
    dt: String,
    data: Vec<Value>,
}

/// Fields of a stored node, as read before shape validation.
#[derive(Debug, Default)]
struct RawMatrix {
    rows: Option<usize>,
    cols: Option<usize>,
    dt: Option<String>,
    data: Vec<f64>,
}

impl RawMatrix {
    fn into_mat(self) -> Result<Mat> {
        let missing = |field: &str| CvToolError::Storage(format!("Matrix node lacks '{}'", field));
        let rows = self.rows.ok_or_else(|| missing("rows"))?;
        let cols = self.cols.ok_or_else(|| missing("cols"))?;
        let dt = self.dt.ok_or_else(|| missing("dt"))?;
        let (encoding, channels) = parse_dt(&dt)?;

        let expected = element_count(rows, cols, channels).map_err(|_| {
            CvToolError::Storage(format!("Matrix {}x{} ({}) is too large", rows, cols, dt))
        })?;
        if self.data.len() != expected {
            return Err(CvToolError::Storage(format!(
                "Matrix {}x{} ({}) needs {} elements, found {}",
                rows,
                cols,
                dt,
                expected,
                self.data.len()
            )));
        }

        Mat::from_f64(rows, cols, channels, encoding, self.data)
    }
}

/// Reads and writes named matrix nodes in a JSON or XML file.
pub struct FileStorage {
    path: PathBuf,
    format: StorageFormat,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = StorageFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with a document holding `mat` under `name`.
    pub fn write(&self, name: &str, mat: &Mat) -> Result<()> {
        let contents = match self.format {
            StorageFormat::Json => to_json(name, mat)?,
            StorageFormat::Xml => to_xml(name, mat)?,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, contents)?;

        log::info!("Stored '{}' in {}", name, self.path.display());
        Ok(())
    }

    /// Loads node `name`. `None` means the file holds no such node.
    pub fn read(&self, name: &str) -> Result<Option<Mat>> {
        let text = std::fs::read_to_string(&self.path)?;
        log::debug!("Reading '{}' from {}", name, self.path.display());

        let raw = match self.format {
            StorageFormat::Json => from_json(&text, name)?,
            StorageFormat::Xml => from_xml(&text, name)?,
        };

        raw.map(RawMatrix::into_mat).transpose()
    }
}

fn to_json(name: &str, mat: &Mat) -> Result<String> {
    let encoding = mat.encoding();
    let data = mat
        .to_f64_vec()
        .into_iter()
        .map(|v| {
            if !v.is_finite() {
                Value::String(format_value(v, encoding))
            } else if matches!(encoding, ElementEncoding::Float32 | ElementEncoding::Float64) {
                serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
            } else {
                Value::from(v as i64)
            }
        })
        .collect();

    let node = JsonMatrix {
        type_id: TYPE_ID.to_string(),
        rows: mat.rows(),
        cols: mat.cols(),
        dt: format_dt(encoding, mat.channels())?,
        data,
    };

    let mut root = serde_json::Map::new();
    root.insert(name.to_string(), serde_json::to_value(node)?);
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

fn from_json(text: &str, name: &str) -> Result<Option<RawMatrix>> {
    let root: Value = serde_json::from_str(text)?;
    let node = match root.get(name) {
        Some(node) => node.clone(),
        None => return Ok(None),
    };

    let matrix: JsonMatrix = serde_json::from_value(node)?;
    if matrix.type_id != TYPE_ID {
        return Err(CvToolError::Storage(format!(
            "Node '{}' has type_id '{}', expected '{}'",
            name, matrix.type_id, TYPE_ID
        )));
    }

    let data = matrix
        .data
        .iter()
        .map(|value| match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| CvToolError::Storage(format!("Invalid element {}", n))),
            Value::String(s) => parse_value(s),
            Value::Null => Ok(f64::NAN),
            other => Err(CvToolError::Storage(format!("Invalid element {}", other))),
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Some(RawMatrix {
        rows: Some(matrix.rows),
        cols: Some(matrix.cols),
        dt: Some(matrix.dt),
        data,
    }))
}

fn to_xml(name: &str, mat: &Mat) -> Result<String> {
    let encoding = mat.encoding();
    let dt = format_dt(encoding, mat.channels())?;
    let data = mat
        .to_f64_vec()
        .into_iter()
        .map(|v| format_value(v, encoding))
        .collect::<Vec<_>>()
        .join(" ");

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    writer.write_event(Event::Start(BytesStart::new(XML_ROOT)))?;
    writer.write_event(Event::Start(
        BytesStart::new(name).with_attributes([("type_id", TYPE_ID)]),
    ))?;

    let rows = mat.rows().to_string();
    let cols = mat.cols().to_string();
    let fields = [
        ("rows", rows.as_str()),
        ("cols", cols.as_str()),
        ("dt", dt.as_str()),
        ("data", data.as_str()),
    ];
    for (tag, text) in fields {
        writer.write_event(Event::Start(BytesStart::new(tag)))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(name)))?;
    writer.write_event(Event::End(BytesEnd::new(XML_ROOT)))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| CvToolError::Storage(format!("XML output is not UTF-8: {}", e)))
}

fn from_xml(text: &str, name: &str) -> Result<Option<RawMatrix>> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut raw: Option<RawMatrix> = None;
    let mut inside = false;
    let mut field = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                depth += 1;
                if depth == 2 && tag == name && raw.is_none() {
                    inside = true;
                    raw = Some(RawMatrix::default());
                } else if inside && depth == 3 {
                    field = tag;
                }
            }
            Event::End(_) => {
                if inside && depth == 2 {
                    inside = false;
                }
                field.clear();
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) => {
                if let (true, Some(node)) = (inside, raw.as_mut()) {
                    let txt = e.unescape()?;
                    let parse_usize = |s: &str| {
                        s.trim()
                            .parse::<usize>()
                            .map_err(|_| CvToolError::Storage(format!("Invalid {} '{}'", field, s)))
                    };
                    match field.as_str() {
                        "rows" => node.rows = Some(parse_usize(&txt)?),
                        "cols" => node.cols = Some(parse_usize(&txt)?),
                        "dt" => node.dt = Some(txt.trim().to_string()),
                        "data" => {
                            for token in txt.split_whitespace() {
                                node.data.push(parse_value(token)?);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(raw)
}
