use console::Style;
use serde::Serialize;

/// Fit-statistic summary emitted by the `fit` subcommand (§3.1, ambient
/// plumbing — no optimizer is wired in, so "best-fit" is the parameter
/// vector the caller supplied, not an iterated result).
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub fit_statistic_kind: String,
    pub fit_statistic_value: f64,
    pub reduced_chi_square: Option<f64>,
    pub n_valid_pixels: usize,
    pub n_params: usize,
    pub param_names: Vec<String>,
    pub param_values: Vec<f64>,
    pub bootstrap: Option<BootstrapSummary>,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub n_trials: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
}

impl Styles {
    fn new() -> Self {
        Styles {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
        }
    }
}

pub fn print_fit_summary(report: &FitReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Fit Summary"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<18}{}",
        s.label.apply_to("Statistic"),
        s.value.apply_to(&report.fit_statistic_kind)
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Value"),
        s.value.apply_to(format!("{:.6}", report.fit_statistic_value))
    );
    if let Some(reduced) = report.reduced_chi_square {
        println!(
            "  {:<18}{}",
            s.label.apply_to("Reduced"),
            s.value.apply_to(format!("{reduced:.6}"))
        );
    }
    println!(
        "  {:<18}{}",
        s.label.apply_to("Valid pixels"),
        s.value.apply_to(report.n_valid_pixels)
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.3}s", report.elapsed_secs))
    );
    println!();

    println!("  {}", s.header.apply_to("Parameters"));
    for (name, value) in report.param_names.iter().zip(report.param_values.iter()) {
        println!("    {:<16}{:.6}", s.label.apply_to(name), value);
    }
    println!();

    if let Some(ref bs) = report.bootstrap {
        println!("  {}", s.header.apply_to("Bootstrap"));
        println!(
            "    {:<14}{}",
            s.label.apply_to("Trials"),
            s.value.apply_to(bs.n_trials)
        );
        println!(
            "    {:<14}{:.6} ± {:.6}",
            s.label.apply_to("Mean ± std"),
            bs.mean,
            bs.std_dev
        );
        println!(
            "    {:<14}[{:.6}, {:.6}]",
            s.label.apply_to("Range"),
            bs.min,
            bs.max
        );
        println!();
    }
}
