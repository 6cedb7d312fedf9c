//! Column model
//!
//! Decides which columns the packet list shows and how each cell value is
//! extracted from a packet. Columns are resolved once at viewer start and
//! never change during a session.
//!
//! Resolution order, most specific first:
//! 1. explicit columns given by the caller
//! 2. columns configured for the base class in [`ColumnConfig`]
//! 3. one column per field declared on the base class, then `PAYLOAD`
//! 4. a single `REPR` column when there is no base class
//!
//! Every variant is prefixed with the fixed `NO` and `TIME` columns.

mod config;
mod formatter;

pub use config::{ColumnConfig, ColumnSpec, ValueFormat};
pub use formatter::fit_cell;

use std::fmt;
use std::sync::Arc;

use crate::packet::{Packet, PacketClass, PacketError};

/// Placeholder rendered when a cell cannot be extracted
pub const PLACEHOLDER: &str = "";

/// Width of auto-generated field columns
pub const FIELD_COLUMN_WIDTH: usize = 12;

/// Everything an extractor may look at for one cell
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    /// Registry index of the packet
    pub index: usize,
    pub packet: &'a Packet,
    /// Capture time of the first listed packet, for relative timestamps
    pub start_time: f64,
}

/// Extracts a display value from a packet
pub type Extractor = Arc<dyn Fn(&CellContext<'_>) -> Result<String, PacketError> + Send + Sync>;

/// A named, fixed-width list column
#[derive(Clone)]
pub struct Column {
    pub name: String,
    pub width: usize,
    extractor: Extractor,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl Column {
    /// Create a column from an arbitrary extractor
    pub fn new<F>(name: impl Into<String>, width: usize, extractor: F) -> Self
    where
        F: Fn(&CellContext<'_>) -> Result<String, PacketError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            width,
            extractor: Arc::new(extractor),
        }
    }

    /// Column showing one packet field
    pub fn field(name: impl Into<String>, width: usize, field: impl Into<String>) -> Self {
        Self::formatted(name, width, field, ValueFormat::Plain)
    }

    /// Column showing one packet field with a value format
    pub fn formatted(
        name: impl Into<String>,
        width: usize,
        field: impl Into<String>,
        format: ValueFormat,
    ) -> Self {
        let field = field.into();
        Self::new(name, width, move |ctx| {
            ctx.packet.field(&field).map(|v| format.apply(v))
        })
    }

    /// `NO`: 1-based registry position
    pub fn number() -> Self {
        Self::new("NO", 5, |ctx| Ok((ctx.index + 1).to_string()))
    }

    /// `TIME`: seconds since the first listed packet
    pub fn time() -> Self {
        Self::new("TIME", 11, |ctx| {
            Ok(format!("{:.6}", ctx.packet.time() - ctx.start_time))
        })
    }

    /// `PAYLOAD`: whatever follows the declared fields
    pub fn payload() -> Self {
        Self::new("PAYLOAD", 50, |ctx| Ok(ctx.packet.payload_repr()))
    }

    /// `REPR`: the packet's full textual representation
    pub fn repr() -> Self {
        Self::new("REPR", 50, |ctx| Ok(ctx.packet.repr()))
    }

    /// Run the extractor, surfacing failures
    pub fn extract(&self, ctx: &CellContext<'_>) -> Result<String, PacketError> {
        (self.extractor)(ctx)
    }

    /// Cell text; extractor failures become [`PLACEHOLDER`]
    pub fn cell(&self, ctx: &CellContext<'_>) -> String {
        match self.extract(ctx) {
            Ok(text) => text,
            Err(e) => {
                tracing::trace!(column = %self.name, index = ctx.index, "cell unavailable: {}", e);
                PLACEHOLDER.to_string()
            }
        }
    }
}

/// Resolve the ordered column list for a session
pub fn resolve_columns(
    basecls: Option<&PacketClass>,
    user_columns: Option<Vec<Column>>,
    config: &ColumnConfig,
) -> Vec<Column> {
    let mut columns = vec![Column::number(), Column::time()];

    if let Some(user) = user_columns.filter(|c| !c.is_empty()) {
        columns.extend(user);
        return columns;
    }

    let Some(basecls) = basecls else {
        columns.push(Column::repr());
        return columns;
    };

    if let Some(specs) = config.get(&basecls.name).filter(|s| !s.is_empty()) {
        columns.extend(specs.iter().map(ColumnSpec::to_column));
        return columns;
    }

    columns.extend(basecls.fields.iter().map(|decl| {
        Column::field(
            decl.name.to_ascii_uppercase(),
            FIELD_COLUMN_WIDTH,
            decl.name.clone(),
        )
    }));
    columns.push(Column::payload());
    columns
}

/// The resolved, immutable column set of a viewer session
#[derive(Debug, Clone)]
pub struct ColumnModel {
    basecls: Option<Arc<PacketClass>>,
    columns: Arc<[Column]>,
}

impl ColumnModel {
    /// Resolve columns once for the session
    pub fn resolve(
        basecls: Option<Arc<PacketClass>>,
        user_columns: Option<Vec<Column>>,
        config: &ColumnConfig,
    ) -> Self {
        let columns = resolve_columns(basecls.as_deref(), user_columns, config);
        tracing::debug!(
            basecls = basecls.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
            "Resolved columns: {}",
            columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self {
            basecls,
            columns: columns.into(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in display order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn basecls(&self) -> Option<&Arc<PacketClass>> {
        self.basecls.as_ref()
    }

    /// Whether a packet may be listed (every packet when there is no base class)
    pub fn supports(&self, packet: &Packet) -> bool {
        self.basecls
            .as_ref()
            .map_or(true, |cls| packet.is_instance_of(cls))
    }

    /// Raw cell values of one row, without padding
    pub fn cells(&self, ctx: &CellContext<'_>) -> Vec<String> {
        self.columns.iter().map(|c| c.cell(ctx)).collect()
    }

    /// Header line: upper-cased column names laid out like the rows
    pub fn header(&self) -> String {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.name.to_uppercase())
            .collect();
        formatter::layout_row(&self.columns, &names)
    }

    /// One formatted list row
    pub fn format_row(&self, ctx: &CellContext<'_>) -> String {
        formatter::layout_row(&self.columns, &self.cells(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ClassCatalog, FieldValue};

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_no_basecls_gives_repr() {
        let columns = resolve_columns(None, None, &ColumnConfig::empty());
        assert_eq!(names(&columns), vec!["NO", "TIME", "REPR"]);
    }

    #[test]
    fn test_explicit_columns_win_over_basecls() {
        let catalog = ClassCatalog::builtin();
        let udp = catalog.get("UDP").unwrap();
        let user = vec![Column::field("DST", 6, "dport"), Column::field("SRC", 6, "sport")];
        let columns = resolve_columns(Some(&udp), Some(user), &ColumnConfig::default());
        assert_eq!(names(&columns), vec!["NO", "TIME", "DST", "SRC"]);
    }

    #[test]
    fn test_empty_explicit_columns_fall_through() {
        let columns = resolve_columns(None, Some(Vec::new()), &ColumnConfig::empty());
        assert_eq!(names(&columns), vec!["NO", "TIME", "REPR"]);
    }

    #[test]
    fn test_basecls_fields_then_payload() {
        let catalog = ClassCatalog::builtin();
        let udp = catalog.get("UDP").unwrap();
        let columns = resolve_columns(Some(&udp), None, &ColumnConfig::empty());
        assert_eq!(
            names(&columns),
            vec!["NO", "TIME", "SPORT", "DPORT", "LEN", "CHKSUM", "PAYLOAD"]
        );
        assert_eq!(columns[2].width, FIELD_COLUMN_WIDTH);
    }

    #[test]
    fn test_configured_columns_for_basecls() {
        let catalog = ClassCatalog::builtin();
        let isotp = catalog.get("ISOTP").unwrap();
        let columns = resolve_columns(Some(&isotp), None, &ColumnConfig::default());
        assert_eq!(names(&columns), vec!["NO", "TIME", "SRC", "DST", "DATA"]);
    }

    #[test]
    fn test_missing_attribute_renders_placeholder() {
        let catalog = ClassCatalog::builtin();
        let raw = catalog.get("Raw").unwrap().instantiate();
        let user = vec![Column::field("SPORT", 6, "sport")];
        let model = ColumnModel::resolve(None, Some(user), &ColumnConfig::empty());
        let ctx = CellContext {
            index: 0,
            packet: &raw,
            start_time: 0.0,
        };
        assert!(model.columns()[2].extract(&ctx).is_err());
        assert_eq!(model.cells(&ctx)[2], PLACEHOLDER);
    }

    #[test]
    fn test_header_and_row_layout() {
        let model = ColumnModel::resolve(None, None, &ColumnConfig::empty());
        assert_eq!(model.header(), "NO    TIME        REPR");

        let catalog = ClassCatalog::builtin();
        let packet = catalog
            .get("Raw")
            .unwrap()
            .instantiate()
            .with_field("load", FieldValue::Bytes(b"ab".to_vec()))
            .unwrap()
            .with_time(43.5);
        let row = model.format_row(&CellContext {
            index: 2,
            packet: &packet,
            start_time: 42.0,
        });
        assert_eq!(&row[..18], "3     1.500000    ");
        assert!(row.ends_with("<Raw  load=b\"ab\">"));
    }

    #[test]
    fn test_supports_basecls_only() {
        let catalog = ClassCatalog::builtin();
        let model = ColumnModel::resolve(catalog.get("UDP"), None, &ColumnConfig::empty());
        assert!(model.supports(&catalog.get("UDP").unwrap().instantiate()));
        assert!(!model.supports(&catalog.get("Raw").unwrap().instantiate()));

        let any = ColumnModel::resolve(None, None, &ColumnConfig::empty());
        assert!(any.supports(&catalog.get("Raw").unwrap().instantiate()));
    }
}
