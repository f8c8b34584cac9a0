//! Column tables stored in catalog sections
//!
//! Exposures and fiber maps are stored column-major with a fixed,
//! versioned column set. Unset integers and NaN floats are stored as null.

use almanac_core::{
    ExposureRecord, FiberMap, FiberRow, ImageType, LampState, Pointing, Sequence, Site,
};
use serde::{Deserialize, Serialize};

pub const EXPOSURES_SCHEMA_VERSION: u32 = 1;
pub const SEQUENCES_SCHEMA_VERSION: u32 = 1;
pub const FIBERS_SCHEMA_VERSION: u32 = 1;

/// Exposure columns, in stored order
pub const EXPOSURE_COLUMNS: [&str; 31] = [
    "site",
    "mjd",
    "exposure",
    "image_type",
    "n_read",
    "lamp_quartz",
    "lamp_thar",
    "lamp_une",
    "field_id",
    "plate_id",
    "config_id",
    "design_id",
    "map_id",
    "cart_id",
    "seeing",
    "focus",
    "collpist",
    "colpitch",
    "dithpix",
    "name",
    "plate_type",
    "date_obs",
    "tcammid",
    "tlsdetb",
    "comment",
    "fps",
    "plugged_mjd",
    "plugged_iteration",
    "flagged_bad",
    "chip_flags",
    "sequence_start",
];

/// Fiber columns, in stored order
pub const FIBER_COLUMNS: [&str; 8] = [
    "fiber_id",
    "hole_type",
    "category",
    "ra",
    "dec",
    "catalogid",
    "designation",
    "sdss_id",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<bool>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render one cell for text export; nulls are empty
    pub fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Int(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Float(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Bool(v) => v[row].to_string(),
            ColumnData::Text(v) => v[row].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnTable {
    pub n_rows: usize,
    pub columns: Vec<Column>,
}

impl ColumnTable {
    fn push(&mut self, name: &str, data: ColumnData) {
        self.columns.push(Column {
            name: name.to_string(),
            data,
        });
    }

    pub fn column(&self, name: &str) -> Result<&ColumnData, String> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| format!("missing column '{}'", name))?;
        if column.data.len() != self.n_rows {
            return Err(format!(
                "column '{}' has {} rows, table has {}",
                name,
                column.data.len(),
                self.n_rows
            ));
        }
        Ok(&column.data)
    }

    fn ints(&self, name: &str) -> Result<&[Option<i64>], String> {
        match self.column(name)? {
            ColumnData::Int(v) => Ok(v),
            _ => Err(format!("column '{}' is not an integer column", name)),
        }
    }

    fn floats(&self, name: &str) -> Result<&[Option<f64>], String> {
        match self.column(name)? {
            ColumnData::Float(v) => Ok(v),
            _ => Err(format!("column '{}' is not a float column", name)),
        }
    }

    fn bools(&self, name: &str) -> Result<&[bool], String> {
        match self.column(name)? {
            ColumnData::Bool(v) => Ok(v),
            _ => Err(format!("column '{}' is not a boolean column", name)),
        }
    }

    fn texts(&self, name: &str) -> Result<&[String], String> {
        match self.column(name)? {
            ColumnData::Text(v) => Ok(v),
            _ => Err(format!("column '{}' is not a text column", name)),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn int_col<T>(rows: &[T], f: impl Fn(&T) -> Option<i64>) -> ColumnData {
    ColumnData::Int(rows.iter().map(f).collect())
}

fn float_col<T>(rows: &[T], f: impl Fn(&T) -> f64) -> ColumnData {
    ColumnData::Float(rows.iter().map(|r| finite(f(r))).collect())
}

fn text_col<T>(rows: &[T], f: impl Fn(&T) -> String) -> ColumnData {
    ColumnData::Text(rows.iter().map(f).collect())
}

fn bool_col<T>(rows: &[T], f: impl Fn(&T) -> bool) -> ColumnData {
    ColumnData::Bool(rows.iter().map(f).collect())
}

/// Build the exposures table; `sequences` supplies each row's
/// `sequence_start`
pub fn exposures_table(records: &[ExposureRecord], sequences: &[Sequence]) -> ColumnTable {
    let r = records;
    let mut t = ColumnTable {
        n_rows: r.len(),
        columns: Vec::with_capacity(EXPOSURE_COLUMNS.len()),
    };
    t.push("site", text_col(r, |e| e.site.to_string()));
    t.push("mjd", int_col(r, |e| Some(e.mjd as i64)));
    t.push("exposure", int_col(r, |e| Some(e.exposure as i64)));
    t.push("image_type", text_col(r, |e| e.image_type.to_string()));
    t.push("n_read", int_col(r, |e| Some(e.n_read as i64)));
    t.push("lamp_quartz", int_col(r, |e| Some(e.lamp_quartz.code() as i64)));
    t.push("lamp_thar", int_col(r, |e| Some(e.lamp_thar.code() as i64)));
    t.push("lamp_une", int_col(r, |e| Some(e.lamp_une.code() as i64)));
    t.push("field_id", int_col(r, |e| e.pointing.field_id));
    t.push("plate_id", int_col(r, |e| e.pointing.plate_id));
    t.push("config_id", int_col(r, |e| e.pointing.config_id));
    t.push("design_id", int_col(r, |e| e.design_id));
    t.push("map_id", int_col(r, |e| e.map_id));
    t.push("cart_id", int_col(r, |e| e.cart_id));
    t.push("seeing", float_col(r, |e| e.seeing));
    t.push("focus", float_col(r, |e| e.focus));
    t.push("collpist", float_col(r, |e| e.collpist));
    t.push("colpitch", float_col(r, |e| e.colpitch));
    t.push("dithpix", float_col(r, |e| e.dithpix));
    t.push("name", text_col(r, |e| e.name.clone()));
    t.push("plate_type", text_col(r, |e| e.plate_type.clone()));
    t.push("date_obs", text_col(r, |e| e.date_obs.clone()));
    t.push("tcammid", text_col(r, |e| e.tcammid.clone()));
    t.push("tlsdetb", text_col(r, |e| e.tlsdetb.clone()));
    t.push("comment", text_col(r, |e| e.comment.clone()));
    t.push("fps", bool_col(r, |e| e.fps));
    t.push("plugged_mjd", int_col(r, |e| e.plugged_mjd.map(i64::from)));
    t.push(
        "plugged_iteration",
        int_col(r, |e| e.plugged_iteration.map(i64::from)),
    );
    t.push("flagged_bad", bool_col(r, |e| e.flagged_bad));
    t.push("chip_flags", int_col(r, |e| Some(e.chip_flags as i64)));
    t.push(
        "sequence_start",
        int_col(r, |e| {
            sequences
                .iter()
                .find(|s| s.contains(e.exposure))
                .map(|s| s.start as i64)
        }),
    );
    t
}

fn required<T: Copy>(column: &str, row: usize, v: Option<T>) -> Result<T, String> {
    v.ok_or_else(|| format!("null in required column '{}' at row {}", column, row))
}

fn narrow<T: TryFrom<i64>>(column: &str, row: usize, v: i64) -> Result<T, String> {
    T::try_from(v).map_err(|_| format!("value {} out of range in '{}' at row {}", v, column, row))
}

/// Rebuild exposure records from a stored table
pub fn exposures_from_table(t: &ColumnTable) -> Result<Vec<ExposureRecord>, String> {
    let site = t.texts("site")?;
    let mjd = t.ints("mjd")?;
    let exposure = t.ints("exposure")?;
    let image_type = t.texts("image_type")?;
    let n_read = t.ints("n_read")?;
    let lamp_quartz = t.ints("lamp_quartz")?;
    let lamp_thar = t.ints("lamp_thar")?;
    let lamp_une = t.ints("lamp_une")?;
    let field_id = t.ints("field_id")?;
    let plate_id = t.ints("plate_id")?;
    let config_id = t.ints("config_id")?;
    let design_id = t.ints("design_id")?;
    let map_id = t.ints("map_id")?;
    let cart_id = t.ints("cart_id")?;
    let seeing = t.floats("seeing")?;
    let focus = t.floats("focus")?;
    let collpist = t.floats("collpist")?;
    let colpitch = t.floats("colpitch")?;
    let dithpix = t.floats("dithpix")?;
    let name = t.texts("name")?;
    let plate_type = t.texts("plate_type")?;
    let date_obs = t.texts("date_obs")?;
    let tcammid = t.texts("tcammid")?;
    let tlsdetb = t.texts("tlsdetb")?;
    let comment = t.texts("comment")?;
    let fps = t.bools("fps")?;
    let plugged_mjd = t.ints("plugged_mjd")?;
    let plugged_iteration = t.ints("plugged_iteration")?;
    let flagged_bad = t.bools("flagged_bad")?;
    let chip_flags = t.ints("chip_flags")?;

    let lamp = |col: &str, i: usize, v: Option<i64>| -> Result<LampState, String> {
        Ok(LampState::from(narrow::<i8>(col, i, required(col, i, v)?)?))
    };
    let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);

    (0..t.n_rows)
        .map(|i| -> Result<ExposureRecord, String> {
            Ok(ExposureRecord {
                site: site[i].parse::<Site>().map_err(|e| e.to_string())?,
                mjd: narrow("mjd", i, required("mjd", i, mjd[i])?)?,
                exposure: narrow("exposure", i, required("exposure", i, exposure[i])?)?,
                image_type: ImageType::parse(&image_type[i]).unwrap_or(ImageType::Unknown),
                n_read: narrow("n_read", i, required("n_read", i, n_read[i])?)?,
                lamp_quartz: lamp("lamp_quartz", i, lamp_quartz[i])?,
                lamp_thar: lamp("lamp_thar", i, lamp_thar[i])?,
                lamp_une: lamp("lamp_une", i, lamp_une[i])?,
                pointing: Pointing {
                    field_id: field_id[i],
                    plate_id: plate_id[i],
                    config_id: config_id[i],
                },
                design_id: design_id[i],
                map_id: map_id[i],
                cart_id: cart_id[i],
                seeing: nan(seeing[i]),
                focus: nan(focus[i]),
                collpist: nan(collpist[i]),
                colpitch: nan(colpitch[i]),
                dithpix: nan(dithpix[i]),
                name: name[i].clone(),
                plate_type: plate_type[i].clone(),
                date_obs: date_obs[i].clone(),
                tcammid: tcammid[i].clone(),
                tlsdetb: tlsdetb[i].clone(),
                comment: comment[i].clone(),
                fps: fps[i],
                plugged_mjd: plugged_mjd[i]
                    .map(|v| narrow("plugged_mjd", i, v))
                    .transpose()?,
                plugged_iteration: plugged_iteration[i]
                    .map(|v| narrow("plugged_iteration", i, v))
                    .transpose()?,
                flagged_bad: flagged_bad[i],
                chip_flags: narrow("chip_flags", i, required("chip_flags", i, chip_flags[i])?)?,
            })
        })
        .collect()
}

/// Inclusive ranges as an N×2 table
pub fn sequences_table(sequences: &[Sequence]) -> Vec<[u32; 2]> {
    sequences.iter().map(|s| [s.start, s.end]).collect()
}

pub fn sequences_from_table(rows: &[[u32; 2]]) -> Vec<Sequence> {
    rows.iter().map(|[s, e]| Sequence::new(*s, *e)).collect()
}

pub fn fiber_table(map: &FiberMap) -> ColumnTable {
    let r = &map.rows;
    let mut t = ColumnTable {
        n_rows: r.len(),
        columns: Vec::with_capacity(FIBER_COLUMNS.len()),
    };
    t.push("fiber_id", int_col(r, |f| Some(f.fiber_id)));
    t.push("hole_type", text_col(r, |f| f.hole_type.clone()));
    t.push("category", text_col(r, |f| f.category.clone()));
    t.push("ra", float_col(r, |f| f.ra));
    t.push("dec", float_col(r, |f| f.dec));
    t.push("catalogid", int_col(r, |f| f.catalogid));
    t.push(
        "designation",
        text_col(r, |f| f.designation.clone().unwrap_or_default()),
    );
    t.push("sdss_id", int_col(r, |f| f.sdss_id));
    t
}

pub fn fiber_rows_from_table(t: &ColumnTable) -> Result<Vec<FiberRow>, String> {
    let fiber_id = t.ints("fiber_id")?;
    let hole_type = t.texts("hole_type")?;
    let category = t.texts("category")?;
    let ra = t.floats("ra")?;
    let dec = t.floats("dec")?;
    let catalogid = t.ints("catalogid")?;
    let designation = t.texts("designation")?;
    let sdss_id = t.ints("sdss_id")?;

    (0..t.n_rows)
        .map(|i| -> Result<FiberRow, String> {
            Ok(FiberRow {
                fiber_id: required("fiber_id", i, fiber_id[i])?,
                hole_type: hole_type[i].clone(),
                category: category[i].clone(),
                ra: ra[i].unwrap_or(f64::NAN),
                dec: dec[i].unwrap_or(f64::NAN),
                catalogid: catalogid[i],
                designation: Some(designation[i].clone()).filter(|d| !d.is_empty()),
                sdss_id: sdss_id[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::Unit;

    #[test]
    fn test_exposure_table_has_fixed_columns() {
        let unit = Unit::new(Site::Apo, 60000);
        let records = vec![
            ExposureRecord::blank(unit, 1, ImageType::Dark),
            ExposureRecord::blank(unit, 2, ImageType::Dark),
        ];
        let table = exposures_table(&records, &[Sequence::new(1, 2)]);
        assert_eq!(table.column_names(), EXPOSURE_COLUMNS.to_vec());
        assert_eq!(table.n_rows, 2);
        assert_eq!(
            table.column("sequence_start").unwrap(),
            &ColumnData::Int(vec![Some(1), Some(1)])
        );
        assert_eq!(
            table.column("seeing").unwrap(),
            &ColumnData::Float(vec![None, None])
        );
    }

    #[test]
    fn test_short_column_is_rejected() {
        let mut table = exposures_table(&[], &[]);
        table.n_rows = 1;
        let err = exposures_from_table(&table).unwrap_err();
        assert!(err.contains("has 0 rows"), "{err}");
    }
}
