use chrono::NaiveDate;
use dre_report::*;
use pretty_assertions::assert_eq;

const ACTUAL_CSV: &str = "\
EMPRESA;FAT MÊS $;DEDUÇÕES LEGAIS;SALÁRIO;VT;TOTAL ENCARGOS;TIMES
ACME;10.000,00;1.000,00;3.000,00;200,00;1.200,00;setembro/25
ACME;5.000,00;500,00;1.000,00;;400,00;agosto/25
BETA;8.000,00;800,00;4.000,00;100,00;1.600,00;09/2025
GAMA;2.000,00;200,00;1.500,00;;600,00;2025-09
";

const BUDGET_CSV: &str = "\
CLIENTE,RECEITA BRUTA,(-) DEDUÇÕES,(-) SALÁRIO,(-) ENCARGOS,COMPETENCIA
ACME,9000,900,3500,1000,2025-09-30
BETA,0,0,3000,1000,2025-09-30
";

fn load(cache: &mut SourceCache<AutoLoader>, csv: &str, profile: &SourceProfile) -> Dataset {
    let source = cache.load(csv.as_bytes(), &profile.sheet).unwrap();
    Dataset::new(source, profile).unwrap()
}

#[test]
fn test_client_dre_from_csv() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);

    assert_eq!(actual.sheet(), "csv");
    assert_eq!(actual.entity_column(), Some("EMPRESA"));
    assert_eq!(actual.period_column(), Some("TIMES"));
    assert_eq!(actual.periods(), vec!["2025-08", "2025-09"]);

    let block = actual.dre(&RecordFilter::client("ACME", "09/2025"));
    assert_eq!(block.gross_revenue(), 10000.0);
    assert_eq!(block.deductions(), 1000.0);
    assert_eq!(block.net_revenue(), 9000.0);
    assert_eq!(block.cost(CanonicalField::Salary), 3000.0);
    assert_eq!(block.cost(CanonicalField::TransportVoucher), 200.0);
    assert_eq!(block.cost(CanonicalField::TotalCharges), 1200.0);
    assert_eq!(block.total_cost(), 4400.0);
    assert_eq!(block.contribution_margin(), 4600.0);
}

#[test]
fn test_consolidated_dre_and_identities() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);

    let block = actual.dre(&RecordFilter::consolidated("2025-09"));
    assert_eq!(block.gross_revenue(), 20000.0);
    assert_eq!(block.net_revenue(), block.gross_revenue() - block.deductions());
    assert_eq!(block.contribution_margin(), block.net_revenue() - block.total_cost());

    let unavailable = actual.fields().unavailable();
    assert!(unavailable.contains(&CanonicalField::Freelance));
    assert!(unavailable.contains(&CanonicalField::ConsumableMaterial));
    assert_eq!(block.cost(CanonicalField::Freelance), 0.0);
}

#[test]
fn test_unknown_period_matches_nothing() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);
    assert!(actual.filter(&RecordFilter::consolidated("Q3")).is_empty());
    let block = actual.dre(&RecordFilter::consolidated("Q3"));
    assert_eq!(block.gross_revenue(), 0.0);
    assert_eq!(block.total_cost(), 0.0);
    assert_eq!(block.margin_ratio(), 0.0);
}

#[test]
fn test_budget_vs_actual_with_different_column_names() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);
    let budget = load(&mut cache, BUDGET_CSV, &config.budget);

    // "SALÁRIO" on one side, "(-) SALÁRIO" on the other.
    assert_eq!(actual.fields().column(CanonicalField::Salary), Some("SALÁRIO"));
    assert_eq!(budget.fields().column(CanonicalField::Salary), Some("(-) SALÁRIO"));
    assert_eq!(budget.fields().column(CanonicalField::GrossRevenue), Some("RECEITA BRUTA"));
    assert_eq!(budget.entity_column(), Some("CLIENTE"));
    assert_eq!(budget.period_column(), Some("COMPETENCIA"));

    let filter = RecordFilter::client("ACME", "2025-09");
    let rows = compare(&budget.dre(&filter), &actual.dre(&filter));
    assert_eq!(rows.len(), 5);

    let gross = &rows[0];
    assert_eq!(gross.line, LineKind::GrossRevenue);
    assert_eq!(gross.budget, 9000.0);
    assert_eq!(gross.actual, 10000.0);
    assert_eq!(gross.delta_abs, 1000.0);
    assert!((gross.delta_pct - 1000.0 / 9000.0).abs() < 1e-12);

    let cost = &rows[3];
    assert_eq!(cost.line, LineKind::TotalCost);
    assert_eq!(cost.budget, 4500.0);
    assert_eq!(cost.actual, 4400.0);
}

#[test]
fn test_zero_budget_variance_is_zero_percent() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);
    let budget = load(&mut cache, BUDGET_CSV, &config.budget);

    let filter = RecordFilter::client("BETA", "2025-09");
    let rows = compare(&budget.dre(&filter), &actual.dre(&filter));
    assert_eq!(rows[0].budget, 0.0);
    assert_eq!(rows[0].actual, 8000.0);
    assert_eq!(rows[0].delta_abs, 8000.0);
    assert_eq!(rows[0].delta_pct, 0.0);
    assert!(rows.iter().all(|r| r.delta_pct.is_finite()));
}

#[test]
fn test_cache_reuses_identical_payloads() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let first = cache.load(ACTUAL_CSV.as_bytes(), &config.actual.sheet).unwrap();
    let second = cache.load(ACTUAL_CSV.as_bytes(), &config.actual.sheet).unwrap();
    let budget = cache.load(BUDGET_CSV.as_bytes(), &config.budget.sheet).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.fingerprint, budget.fingerprint);
    let stats = cache.stats();
    assert_eq!((stats.misses, stats.hits, stats.entries), (2, 1, 2));
}

#[test]
fn test_empty_payload_halts() {
    let mut cache = SourceCache::new(AutoLoader);
    let err = cache.load(b"", "bd").unwrap_err();
    assert!(matches!(err, DreError::SourceUnavailable(_)));
}

#[test]
fn test_ranking_by_margin_ratio() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);

    let grouped = aggregate_by(&actual, &RecordFilter::consolidated("2025-09"), &[GroupKey::Entity]);
    let ranking = grouped.rank(RankMetric::MarginRatio, SortOrder::Descending, Some(2));
    let names: Vec<&str> = ranking.iter().map(|r| r.key[0].as_str()).collect();
    // ACME 4600/10000, BETA 1500/8000, GAMA -300/2000
    assert_eq!(names, vec!["ACME", "BETA"]);

    let by_cost = grouped.rank(RankMetric::TotalCost, SortOrder::Ascending, None);
    let names: Vec<&str> = by_cost.iter().map(|r| r.key[0].as_str()).collect();
    assert_eq!(names, vec!["GAMA", "ACME", "BETA"]);
}

#[test]
fn test_resolve_returns_first_present_alias() {
    let columns: Vec<String> = ["vr", " Vale Refeição ", "VALE REFEICAO"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let aliases = ["VALE REFEIÇÃO", "VALE REFEICAO", "VR"];
    // Every ordering of the aliases picks the column of its first alias.
    let orders: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let expected_for = |alias: &str| match alias {
        "VALE REFEIÇÃO" => " Vale Refeição ",
        "VALE REFEICAO" => "VALE REFEICAO",
        _ => "vr",
    };
    for order in orders {
        let list: Vec<&str> = order.iter().map(|&i| aliases[i]).collect();
        assert_eq!(resolve(&columns, &list), Some(expected_for(list[0])));
    }
    assert_eq!(resolve(&columns, &["FREELANCE"]), None);
}

#[test]
fn test_period_encodings_agree() {
    let ts = NaiveDate::from_ymd_opt(2025, 9, 30)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(normalize(&Scalar::Date(ts)), "2025-09");
    assert_eq!(normalize(&Scalar::Text("09/2025".into())), "2025-09");
    assert_eq!(normalize(&Scalar::Text("2025-09".into())), "2025-09");
    for label in ["2025-09", "1999-12", "not a period"] {
        assert_eq!(normalize_text(&normalize_text(label)), normalize_text(label));
    }
}

#[test]
fn test_exports_are_flat() {
    let block = DreBlock::from_parts(10000.0, 1000.0, vec![(CanonicalField::Salary, 3000.0)]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("variance.csv");
    let rows = reports::variance_export_rows(&compare(&block, &block));
    output::write_csv(&path, &rows).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().next(), Some("Line,Budget,Actual,DeltaAbs,DeltaPct"));
    assert_eq!(written.lines().count(), 6);
}

#[test]
fn test_per_client_export_keeps_cost_lines() {
    let config = DreConfig::default();
    let mut cache = SourceCache::new(AutoLoader);
    let actual = load(&mut cache, ACTUAL_CSV, &config.actual);

    let grouped = aggregate_by(
        &actual,
        &RecordFilter::consolidated("2025-09"),
        &[GroupKey::Entity, GroupKey::Period],
    );
    let rows = reports::summary_line_rows(&grouped);
    let acme_vt = rows
        .iter()
        .find(|r| r.entity == "ACME" && r.line == "(–) VALE TRANSPORTE")
        .map(|r| r.value);
    assert_eq!(acme_vt, Some(200.0));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clientes.csv");
    output::write_csv(&path, &rows).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().next(), Some("Entity,Period,Line,Value,AV%"));
    assert!(written.contains("BETA,2025-09,(–) SALÁRIO,4000.0,0.5"));
}
