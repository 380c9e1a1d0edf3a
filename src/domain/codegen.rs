//! Code generation: AST to a self-contained pandas backtest program.
//!
//! The program is assembled from fixed fragments in order: imports, embedded
//! metadata, backtest settings, indicator helpers, the guarded entry and exit
//! predicates, and the backtest driver. Generation is deterministic and total
//! over any AST; unrecognized indicator text is emitted verbatim and fails
//! closed inside the predicate guard at evaluation time.

use crate::domain::ast::{Ast, RuleRecord};
use crate::domain::indicator::{IndicatorRef, MACD_SPANS, translate_value};

/// Literal used for an empty rule block.
pub const FALSE_LITERAL: &str = "False";

const SECTION_RULE: &str =
    "# -----------------------------------------------------------------------------";

/// Values the generated backtest driver runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub data_path: String,
    pub report_path: String,
    pub warmup: usize,
    pub initial_capital: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            data_path: "synthetic_OHLCV.csv".to_string(),
            report_path: "report.csv".to_string(),
            warmup: 20,
            initial_capital: 10_000.0,
        }
    }
}

pub struct GenerationContext<'a> {
    pub ast: &'a Ast,
    pub query: &'a str,
    pub dsl_text: &'a str,
    pub settings: &'a BacktestSettings,
}

/// Boolean expression for one rule block.
///
/// Each rule becomes `(lhs op rhs)`; a rule's `logic_op` joins it to the next
/// rule as ` and ` (for `AND`, any case) or ` or ` (anything else). A
/// connective on the last rule has nothing to join and is dropped.
pub fn condition_string(rules: &[RuleRecord]) -> String {
    if rules.is_empty() {
        return FALSE_LITERAL.to_string();
    }

    let mut output = String::new();
    for (i, rule) in rules.iter().enumerate() {
        let expr = &rule.expression;
        output.push_str(&format!(
            "({} {} {})",
            IndicatorRef::classify(&expr.indicator).translate(),
            expr.operator,
            translate_value(&expr.value)
        ));

        let has_next = i + 1 < rules.len();
        if let (Some(logic), true) = (&rule.logic_op, has_next) {
            let connective = if logic.eq_ignore_ascii_case("AND") {
                "and"
            } else {
                "or"
            };
            output.push_str(&format!(" {} ", connective));
        }
    }
    output
}

/// Escape text for embedding between `"""` delimiters.
///
/// Backslashes are doubled, every `"""` becomes `\"\"\"`, and a final `"`
/// is escaped so it cannot merge with the closing delimiter.
pub fn escape_metadata(text: &str) -> String {
    let doubled = text.replace('\\', "\\\\");
    let (body, trailing_quote) = match doubled.strip_suffix('"') {
        Some(body) => (body, true),
        None => (doubled.as_str(), false),
    };
    let mut escaped = body.replace("\"\"\"", "\\\"\\\"\\\"");
    if trailing_quote {
        escaped.push_str("\\\"");
    }
    escaped
}

/// String literal in the target language.
fn string_literal(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

pub fn generate_program(ctx: &GenerationContext) -> String {
    let mut output = String::new();

    output.push_str(&render_imports());
    output.push_str(&render_metadata(ctx));
    output.push_str(&render_settings(ctx.settings));
    output.push_str(&render_helpers());
    output.push_str(&render_predicates(ctx.ast));
    output.push_str(&render_backtest());
    output.push_str(&render_main_guard());

    output
}

fn render_section(title: &str) -> String {
    format!("{}\n# {}\n{}\n", SECTION_RULE, title, SECTION_RULE)
}

fn render_imports() -> String {
    String::from("import pandas as pd\nimport numpy as np\n\n")
}

fn render_metadata(ctx: &GenerationContext) -> String {
    let mut output = render_section("Metadata");
    output.push_str(&format!(
        "NL_QUERY = \"\"\"{}\"\"\"\n",
        escape_metadata(ctx.query)
    ));
    output.push_str(&format!(
        "DSL_TEXT = \"\"\"{}\"\"\"\n",
        escape_metadata(ctx.dsl_text)
    ));
    output.push_str(&format!(
        "AST_DATA = \"\"\"{}\"\"\"\n\n",
        escape_metadata(&ctx.ast.to_json())
    ));
    output
}

fn render_settings(settings: &BacktestSettings) -> String {
    let mut output = render_section("Backtest Settings");
    output.push_str(&format!("DATA_PATH = {}\n", string_literal(&settings.data_path)));
    output.push_str(&format!(
        "REPORT_PATH = {}\n",
        string_literal(&settings.report_path)
    ));
    output.push_str(&format!("WARMUP = {}\n", settings.warmup));
    output.push_str(&format!(
        "INITIAL_CAPITAL = {:?}\n",
        settings.initial_capital
    ));
    output.push_str(
        "TRADE_COLUMNS = ['Entry Date', 'Exit Date', 'Entry Price', 'Exit Price', 'PnL', 'Return %']\n\n",
    );
    output
}

fn render_helpers() -> String {
    let mut output = render_section("Indicator Helper Functions");
    output.push_str(
        r#"
def calculate_rsi(series, period):
    if len(series) < period:
        return pd.Series([50] * len(series), index=series.index)
    delta = series.diff()
    gain = delta.where(delta > 0, 0).rolling(period).mean()
    loss = (-delta.where(delta < 0, 0)).rolling(period).mean()
    rs = gain / loss
    rsi = 100 - (100 / (1 + rs))
    return rsi.where(loss != 0, 100)

"#,
    );

    let (fast, slow, signal) = MACD_SPANS;
    output.push_str(&format!(
        "def calculate_macd(series, fast={}, slow={}, signal={}):\n",
        fast, slow, signal
    ));
    output.push_str(
        r#"    exp1 = series.ewm(span=fast, adjust=False).mean()
    exp2 = series.ewm(span=slow, adjust=False).mean()
    macd = exp1 - exp2
    signal_line = macd.ewm(span=signal, adjust=False).mean()
    return macd

"#,
    );
    output
}

fn render_predicates(ast: &Ast) -> String {
    let mut output = render_section("Strategy Logic");
    output.push('\n');
    output.push_str(&render_predicate("entry_rule", &ast.entry));
    output.push('\n');
    output.push_str(&render_predicate("exit_rule", &ast.exit));
    output.push('\n');
    output
}

fn render_predicate(name: &str, rules: &[RuleRecord]) -> String {
    format!(
        "def {}(df):\n    try:\n        return {}\n    except Exception:\n        return False\n",
        name,
        condition_string(rules)
    )
}

fn render_backtest() -> String {
    let mut output = render_section("Backtest Engine");
    output.push_str(
        r#"
def run_backtest():
    try:
        df = pd.read_csv(DATA_PATH)
        df['date'] = pd.to_datetime(df['date'])
    except FileNotFoundError:
        print(f"Error: {DATA_PATH} not found.")
        return

    in_position = False
    entry_price = 0.0
    entry_date = None
    trades = []

    for i in range(WARMUP, len(df)):
        window = df.iloc[:i + 1]
        current_price = window['close'].iloc[-1]
        current_date = window['date'].iloc[-1]

        if not in_position:
            if entry_rule(window):
                in_position = True
                entry_price = current_price
                entry_date = current_date
        elif exit_rule(window):
            in_position = False
            pnl = current_price - entry_price
            trades.append({
                'Entry Date': entry_date,
                'Exit Date': current_date,
                'Entry Price': entry_price,
                'Exit Price': current_price,
                'PnL': pnl,
                'Return %': (pnl / entry_price) * 100,
            })

    trades_df = pd.DataFrame(trades, columns=TRADE_COLUMNS)

    if not trades_df.empty:
        total_return_pct = trades_df['Return %'].sum()
        equity = [INITIAL_CAPITAL]
        for pnl in trades_df['PnL']:
            equity.append(equity[-1] + pnl)
        equity_series = pd.Series(equity)
        rolling_max = equity_series.cummax()
        drawdown = (equity_series - rolling_max) / rolling_max
        max_drawdown_pct = drawdown.min() * 100
    else:
        total_return_pct = 0.0
        max_drawdown_pct = 0.0
    trade_count = len(trades_df)

    trades_df.to_csv(REPORT_PATH, index=False)

    print("Natural Language Input:")
    print(f'"{NL_QUERY.strip()}"')
    print("\nGenerated DSL:")
    print(DSL_TEXT.strip())
    print("\nParsed AST:", AST_DATA)
    print("\nBacktest Result:")
    print(f"Total Return: {total_return_pct:.1f}%")
    print(f"Max Drawdown: {max_drawdown_pct:.1f}%")
    print(f"Trades: {trade_count}")
    print("Entry/Exit Log:")
    for _, row in trades_df.iterrows():
        print(f"- Enter: {row['Entry Date'].date()} at {row['Entry Price']}")
        print(f"- Exit: {row['Exit Date'].date()} at {row['Exit Price']}")

"#,
    );
    output
}

fn render_main_guard() -> String {
    String::from("if __name__ == \"__main__\":\n    run_backtest()\n")
}
