// Entry point and high-level CLI flow.
//
// - Option [1] loads the actual (and optional budget) source, printing which
//   sheet was used and which fields are unavailable.
// - Options [2]-[5] render a report, preview it and export it to CSV.
// - After a report the user can go back to the selection menu or exit.
//
// Usage: dre_report [ACTUAL_FILE] [BUDGET_FILE] [CONFIG_JSON]
use dre_report::output::{preview_table, write_csv, write_json};
use dre_report::period::parse_period;
use dre_report::reports::{
    dre_statement_preview, dre_statement_rows, ranking_export_rows, summary_line_rows,
    summary_rows, variance_export_rows,
};
use dre_report::util::format_int;
use dre_report::{
    aggregate_by, compare, compare_cost_lines, AutoLoader, Dataset, DreConfig, GroupKey,
    RankMetric, RecordFilter, SortOrder, SourceCache, SourceProfile,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

struct AppState {
    config: DreConfig,
    cache: SourceCache<AutoLoader>,
    actual_path: PathBuf,
    budget_path: Option<PathBuf>,
    actual: Option<Dataset>,
    budget: Option<Dataset>,
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask the user whether to go back to the report selection menu.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Numbered pick list. An empty answer selects `default`.
fn prompt_select(label: &str, options: &[String], default: usize) -> Option<String> {
    if options.is_empty() {
        println!("No {} values available.\n", label);
        return None;
    }
    println!("{}:", label);
    for (idx, opt) in options.iter().enumerate() {
        println!("  [{}] {}", idx + 1, opt);
    }
    loop {
        let answer = read_line(&format!("{} (default {}): ", label, default + 1));
        if answer.is_empty() {
            return options.get(default).cloned();
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Some(options[n - 1].clone()),
            _ => println!("Invalid choice. Please enter 1-{}.", options.len()),
        }
    }
}

fn export<T: serde::Serialize>(path: &str, rows: &[T]) {
    match write_csv(path, rows) {
        Ok(()) => println!("(Full table exported to {})\n", path),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn load_dataset(
    cache: &mut SourceCache<AutoLoader>,
    path: &Path,
    profile: &SourceProfile,
) -> dre_report::Result<Dataset> {
    let bytes = std::fs::read(path)?;
    let source = cache.load(&bytes, &profile.sheet)?;
    Dataset::new(source, profile)
}

fn describe(label: &str, dataset: &Dataset) {
    println!(
        "{}: sheet '{}' ({} rows, {} clients, {} periods)",
        label,
        dataset.sheet(),
        format_int(dataset.table().len()),
        format_int(dataset.entities().len()),
        format_int(dataset.periods().len())
    );
    let missing = dataset.fields().unavailable();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|f| f.to_string()).collect();
        println!("Info: fields unavailable (counted as zero): {}", names.join(", "));
    }
}

/// Handle option [1]: load the sources.
fn handle_load(state: &mut AppState) {
    match load_dataset(&mut state.cache, &state.actual_path, &state.config.actual) {
        Ok(ds) => {
            describe("Actual", &ds);
            state.actual = Some(ds);
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", state.actual_path.display(), e);
            return;
        }
    }
    if let Some(path) = &state.budget_path {
        match load_dataset(&mut state.cache, path, &state.config.budget) {
            Ok(ds) => {
                describe("Budget", &ds);
                state.budget = Some(ds);
            }
            Err(e) => eprintln!("Failed to load budget {}: {}", path.display(), e),
        }
    }
    let stats = state.cache.stats();
    println!("Cache: {} parsed, {} reused\n", stats.misses, stats.hits);
}

/// Period pick list shown as `2025-09 (setembro/2025)`; returns the key.
fn select_period(ds: &Dataset) -> Option<String> {
    let periods = ds.periods();
    let shown: Vec<String> = periods
        .iter()
        .map(|p| match parse_period(p) {
            Some(period) => format!("{} ({})", p, period.display_label()),
            None => p.clone(),
        })
        .collect();
    let last = shown.len().saturating_sub(1);
    let choice = prompt_select("Period", &shown, last)?;
    let idx = shown.iter().position(|s| *s == choice)?;
    periods.get(idx).cloned()
}

/// Handle option [2]: DRE for one client in one period.
fn handle_client_dre(ds: &Dataset) {
    let Some(entity) = prompt_select("Client", &ds.entities(), 0) else {
        return;
    };
    let Some(period) = select_period(ds) else {
        return;
    };
    let block = ds.dre(&RecordFilter::client(&entity, &period));
    let rows = dre_statement_rows(&block);
    let preview = dre_statement_preview(&block);
    preview_table(
        &format!("DRE – {} | {}", entity, period),
        Some("REALIZADO | AV% = valor ÷ FATURAMENTO BRUTO"),
        &preview,
        preview.len(),
    );
    export("dre_cliente.csv", &rows);
}

/// Handle option [3]: consolidated DRE for one period.
fn handle_consolidated_dre(ds: &Dataset) {
    let Some(period) = select_period(ds) else {
        return;
    };
    let filter = RecordFilter::consolidated(&period);
    let block = ds.dre(&filter);
    let rows = dre_statement_rows(&block);
    let preview = dre_statement_preview(&block);
    preview_table(
        &format!("DRE – Consolidado | {}", period),
        None,
        &preview,
        preview.len(),
    );
    export("dre_consolidado.csv", &rows);

    let grouped = aggregate_by(ds, &filter, &[GroupKey::Entity, GroupKey::Period]);
    let summary = summary_rows(&grouped);
    if let Err(e) = write_json("dre_consolidado_clientes.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    export("dre_consolidado_clientes.csv", &summary_line_rows(&grouped));
}

/// Handle option [4]: client ranking for one period.
fn handle_ranking(ds: &Dataset) {
    let Some(period) = select_period(ds) else {
        return;
    };
    let metrics = vec![
        "Faturamento bruto".to_string(),
        "Custo total (CSP)".to_string(),
        "Margem de contribuição".to_string(),
        "Margem % (MC ÷ faturamento)".to_string(),
    ];
    let Some(choice) = prompt_select("Metric", &metrics, 0) else {
        return;
    };
    let metric = match metrics.iter().position(|m| *m == choice) {
        Some(1) => RankMetric::TotalCost,
        Some(2) => RankMetric::ContributionMargin,
        Some(3) => RankMetric::MarginRatio,
        _ => RankMetric::GrossRevenue,
    };
    let order = match read_line("Order (A)scending / (D)escending [D]: ")
        .to_uppercase()
        .as_str()
    {
        "A" => SortOrder::Ascending,
        _ => SortOrder::Descending,
    };
    let top_n = read_line("Top N (blank = all): ")
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0);

    let grouped = aggregate_by(ds, &RecordFilter::consolidated(&period), &[GroupKey::Entity]);
    let ranking = grouped.rank(metric, order, top_n);
    let rows = ranking_export_rows(&ranking, metric);
    preview_table(
        &format!("Ranking – {} | {}", choice, period),
        None,
        &rows,
        rows.len(),
    );
    export("ranking.csv", &rows);
}

/// Handle option [5]: budget vs actual.
fn handle_variance(actual: &Dataset, budget: Option<&Dataset>) {
    let Some(budget) = budget else {
        println!("Error: No budget source loaded. Pass a budget file as the second argument.\n");
        return;
    };
    let Some(period) = select_period(actual) else {
        return;
    };
    let mut entities = vec!["(consolidado)".to_string()];
    entities.extend(actual.entities());
    let Some(entity) = prompt_select("Client", &entities, 0) else {
        return;
    };
    let filter = if entity == entities[0] {
        RecordFilter::consolidated(&period)
    } else {
        RecordFilter::client(&entity, &period)
    };

    let budget_block = budget.dre(&filter);
    let actual_block = actual.dre(&filter);
    let mut rows = variance_export_rows(&compare(&budget_block, &actual_block));
    rows.extend(variance_export_rows(&compare_cost_lines(
        &budget_block,
        &actual_block,
    )));
    preview_table(
        &format!("Orçado x Realizado – {} | {}", entity, period),
        None,
        &rows,
        rows.len(),
    );
    export("orcado_x_realizado.csv", &rows);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let actual_path = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("BD.xlsx"));
    let budget_path = args.get(2).map(PathBuf::from);
    let config = match args.get(3) {
        Some(path) => match DreConfig::from_json_file(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => DreConfig::default(),
    };

    let mut state = AppState {
        config,
        cache: SourceCache::new(AutoLoader),
        actual_path,
        budget_path,
        actual: None,
        budget: None,
    };

    loop {
        println!("Select Report:");
        println!("[1] Load the file");
        println!("[2] DRE por Cliente");
        println!("[3] DRE Consolidado");
        println!("[4] Ranking de Clientes");
        println!("[5] Orçado x Realizado");
        println!("[0] Exit\n");
        let choice = read_choice();
        match choice.as_str() {
            "0" => {
                println!("Exiting the program.");
                break;
            }
            "1" => {
                handle_load(&mut state);
                continue;
            }
            "2" | "3" | "4" | "5" => {}
            _ => {
                println!("Invalid choice. Please enter 0-5.\n");
                continue;
            }
        }
        let Some(actual) = state.actual.as_ref() else {
            println!("Error: No data loaded. Please load the file first (option 1).\n");
            continue;
        };
        println!();
        match choice.as_str() {
            "2" => handle_client_dre(actual),
            "3" => handle_consolidated_dre(actual),
            "4" => handle_ranking(actual),
            _ => handle_variance(actual, state.budget.as_ref()),
        }
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}
