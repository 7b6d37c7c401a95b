use colored::{Color, ColoredString, Colorize};

use crate::judge::{RunTotals, Verdict};

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Correct => Color::Green,
                WrongAnswer => Color::Yellow,
                Timeout => Color::Red,
                RuntimeError => Color::Magenta,
                EmptyOutput => Color::Blue,
                CompileError => Color::BrightBlack,
            };
        }

        match self {
            Correct => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WrongAnswer => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            Timeout => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            RuntimeError => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            EmptyOutput => Color::TrueColor {
                r: 40,
                g: 110,
                b: 220,
            },
            CompileError => Color::TrueColor {
                r: 120,
                g: 120,
                b: 120,
            },
        }
    }
}

pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {:<3} ", verdict.abbr())
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// `<label>: <icon> <verdict> [<ms>ms]`
pub fn case_line(label: &str, verdict: Verdict, elapsed_ms: u64) -> String {
    let timing = match verdict {
        Verdict::CompileError => String::new(),
        _ => format!(" [{}ms]", elapsed_ms),
    };
    format!(
        "{}: {} {}{}",
        label.bold(),
        self::verdict_icon(verdict),
        verdict.to_string().color(verdict.color()),
        timing.dimmed(),
    )
}

/// Correct goes to stdout, everything else to stderr.
pub fn print_case_line(label: &str, verdict: Verdict, elapsed_ms: u64) {
    let line = self::case_line(label, verdict, elapsed_ms);
    if verdict.is_correct() {
        println!("{}", line);
    } else {
        eprintln!("{}", line);
    }
}

pub fn summary_line(totals: &RunTotals) -> String {
    let bar = "-".repeat(5);
    let num_total = totals.total();
    let num_failed = num_total - totals.correct;

    let msg = if num_total == 0 {
        "No cases were run".yellow().to_string()
    } else if totals.all_correct() {
        format!("All {} cases passed", num_total).green().to_string()
    } else {
        let summary = if totals.correct > 0 {
            format!("{}/{} cases failed", num_failed, num_total)
        } else {
            format!("All {} cases failed", num_total)
        };
        let detail = [
            Verdict::WrongAnswer,
            Verdict::Timeout,
            Verdict::RuntimeError,
            Verdict::EmptyOutput,
            Verdict::CompileError,
        ]
        .into_iter()
        .filter(|&v| totals.count(v) > 0)
        .map(|v| {
            format!(
                "{}{}{}",
                self::verdict_icon(v),
                "x".dimmed(),
                totals.count(v).to_string().bold().bright_white(),
            )
        })
        .collect::<Vec<String>>()
        .join(", ");
        format!("{} ({})", summary.bright_red(), detail)
    };
    format!("{} {} {}", bar, msg, bar)
}

/// Colored summary line followed by the plain report.
pub fn print_report(totals: &RunTotals) {
    println!("{}", self::summary_line(totals));
    println!("{}", totals);
}
