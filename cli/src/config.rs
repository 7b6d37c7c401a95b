use anyhow::Context as _;
use bjudge_core::{cmdline::CommandTemplate, Config};

use crate::{cmd::Args, util};

/// Command-line flags override whatever the config file (or the defaults) said.
pub fn with_args(mut cfg: Config, args: &Args) -> anyhow::Result<Config> {
    if let Some(limit) = args.time_limit() {
        cfg.run.time_limit_ms = u64::try_from(limit.as_millis())
            .with_context(|| format!("Time limit is too large: {:?}", limit))?;
    }
    if let Some(cmd) = &args.compile {
        cfg.compile.command = CommandTemplate::parse(cmd)
            .with_context(|| format!("Invalid compile command: {:?}", cmd))?;
    }
    if let Some(dir) = &args.output_dir {
        cfg.run.output_dir = dir.clone();
    }
    if let Some(deadline) = args.deadline {
        cfg.run.deadline = deadline.into();
    }
    if let Some(compare) = args.compare {
        cfg.run.compare = compare.into();
    }
    if args.check_exit_status {
        cfg.run.check_exit_status = true;
    }
    Ok(cfg)
}

pub fn from_file_and_args(args: &Args) -> anyhow::Result<Config> {
    let cfg = Config::load(args.config.as_deref(), util::current_dir())?;
    self::with_args(cfg, args)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use bjudge_core::judge::{CompareMode, DeadlinePolicy};
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["bjudge", "-i", "in", "-a", "ans"];
        argv.extend_from_slice(extra);
        argv.push("main.c");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn no_flags_keep_config() {
        let base = Config::from_toml("[run]\ntime_limit_ms = 250\ncompare = \"exact\"").unwrap();
        let cfg = with_args(base.clone(), &args(&[])).unwrap();
        assert_eq!(cfg, base);
    }

    #[test]
    fn flags_override_config() {
        let base = Config::from_toml("[run]\ntime_limit_ms = 250\ncompare = \"exact\"").unwrap();
        let cfg = with_args(
            base,
            &args(&[
                "-t",
                "3",
                "--compare",
                "prefix",
                "--deadline",
                "first-output",
                "--output-dir",
                "out",
                "--check-exit-status",
                "--compile",
                "gcc -O2 #{source} -o #{artifact}",
            ]),
        )
        .unwrap();
        assert_eq!(cfg.run.time_limit_ms, 3000);
        assert_eq!(cfg.run.compare, CompareMode::Prefix);
        assert_eq!(cfg.run.deadline, DeadlinePolicy::FirstOutput);
        assert_eq!(cfg.run.output_dir, PathBuf::from("out"));
        assert!(cfg.run.check_exit_status);
        assert_eq!(cfg.compile.command.as_str(), "gcc -O2 #{source} -o #{artifact}");
    }

    #[test]
    fn huge_time_limit_is_rejected() {
        let max = u64::MAX.to_string();
        let e = with_args(Config::default(), &args(&["-t", max.as_str()])).unwrap_err();
        assert!(format!("{:#}", e).contains("Time limit is too large"));

        let cfg = with_args(
            Config::default(),
            &args(&["-t", max.as_str(), "--time-unit", "ms"]),
        )
        .unwrap();
        assert_eq!(cfg.run.time_limit_ms, u64::MAX);
    }

    #[test]
    fn bad_compile_template_is_rejected() {
        let e = with_args(Config::default(), &args(&["--compile", "cc #{nope}"])).unwrap_err();
        assert!(format!("{:#}", e).contains("Invalid compile command"));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("judge.toml");
        fsutil::write(&path, "[run]\ntime_limit_ms = 777\n").unwrap();

        let path_str = path.to_str().unwrap();
        let cfg = from_file_and_args(&args(&["-c", path_str])).unwrap();
        assert_eq!(cfg.run.time_limit_ms, 777);
        assert_eq!(cfg.source_config_file.as_deref(), Some(path.as_path()));
    }
}
