//! Named instruments exposed on the metrics endpoint

use super::registry::{InstrumentHandle, InstrumentKind, MetricRegistry};

pub const EXPENSES_ADDED: &str = "despesas_adicionadas_total";
pub const INCOME_ADDED: &str = "receitas_adicionadas_total";
pub const OPERATION_DURATION: &str = "operacao_duracao_segundos";
pub const LOAD_DURATION: &str = "carregamento_dados_segundos";
pub const BALANCE: &str = "saldo_atual_reais";
pub const TOTAL_EXPENSES: &str = "total_despesas_reais";
pub const TOTAL_INCOME: &str = "total_receitas_reais";
pub const RECORD_COUNT: &str = "registros_totais";
pub const RECORDS_BY_CATEGORY: &str = "registros_por_categoria";
pub const APP_HEALTH: &str = "app_health";
pub const APP_INFO: &str = "app_info";

/// Handles to every instrument the application publishes
#[derive(Debug, Clone)]
pub struct Instruments {
    pub expenses_added: InstrumentHandle,
    pub income_added: InstrumentHandle,
    pub operation_duration: InstrumentHandle,
    pub load_duration: InstrumentHandle,
    pub balance: InstrumentHandle,
    pub total_expenses: InstrumentHandle,
    pub total_income: InstrumentHandle,
    pub record_count: InstrumentHandle,
    pub records_by_category: InstrumentHandle,
    pub app_health: InstrumentHandle,
    pub app_info: InstrumentHandle,
}

impl Instruments {
    /// Register (or look up) the full set; safe to call repeatedly
    pub fn register(registry: &MetricRegistry) -> Self {
        use InstrumentKind::*;

        Self {
            expenses_added: registry.get_or_create(
                Counter,
                EXPENSES_ADDED,
                "Expense records added",
                &["categoria", "tipo"],
            ),
            income_added: registry.get_or_create(
                Counter,
                INCOME_ADDED,
                "Income records added",
                &["categoria"],
            ),
            operation_duration: registry.get_or_create(
                Histogram,
                OPERATION_DURATION,
                "Duration of instrumented operations",
                &["operacao"],
            ),
            load_duration: registry.get_or_create(
                Histogram,
                LOAD_DURATION,
                "Time spent loading the ledger file",
                &[],
            ),
            balance: registry.get_or_create(Gauge, BALANCE, "Current balance (income - expenses)", &[]),
            total_expenses: registry.get_or_create(Gauge, TOTAL_EXPENSES, "Sum of all expenses", &[]),
            total_income: registry.get_or_create(Gauge, TOTAL_INCOME, "Sum of all income", &[]),
            record_count: registry.get_or_create(Gauge, RECORD_COUNT, "Records in the ledger", &[]),
            records_by_category: registry.get_or_create(
                Gauge,
                RECORDS_BY_CATEGORY,
                "Records in the ledger per category",
                &["categoria"],
            ),
            app_health: registry.get_or_create(
                Gauge,
                APP_HEALTH,
                "Application health (1 = healthy, 0 = unhealthy)",
                &[],
            ),
            app_info: registry.get_or_create(Info, APP_INFO, "Service identity", &[]),
        }
    }
}
