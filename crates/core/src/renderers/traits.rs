use crate::errors::CoreError;
use crate::models::chart::ChartData;

/// Consumer of computed chart data (plotting library, UI, file writer).
///
/// Renderers are pure sinks: they must not feed anything back into the
/// core, and the core does not assume a chart has been drawn when
/// `render` returns.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, chart: &ChartData) -> Result<(), CoreError>;
}
