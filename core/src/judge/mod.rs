pub mod case;
pub mod compare;
pub mod runner;
pub mod target;
pub mod totals;
pub mod verdict;

pub use case::*;
pub use compare::*;
pub use runner::*;
pub use target::*;
pub use totals::*;
pub use verdict::*;

/// Shell scripts standing in for compiled programs in tests.
#[cfg(test)]
pub(crate) mod fixture {
    use std::path::{Path, PathBuf};

    use crate::cmdline::CommandTemplate;
    use crate::config::CompileConfig;

    pub const SQUARE: &str = "#!/bin/sh\nread n\necho $((n * n))\n";
    pub const ECHO: &str = "#!/bin/sh\ncat\n";
    pub const SILENT_CRASH: &str = "#!/bin/sh\nexit 3\n";
    pub const LOOP_FOREVER: &str = "#!/bin/sh\nwhile :; do :; done\n";
    pub const SYNTAX_ERROR: &str = "int main( {\n";

    /// "Compiles" a shell script by copying it next to the source and marking it executable.
    pub fn script_compile_config() -> CompileConfig {
        CompileConfig {
            shell: "/bin/sh".into(),
            command: CommandTemplate::parse(
                "head -n1 #{source} | grep -q '^#!' && cp #{source} #{artifact} && chmod +x #{artifact}",
            )
            .unwrap(),
            artifact: CommandTemplate::parse("#{source}.out").unwrap(),
        }
    }

    pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fsutil::write_with_mkdir(&path, contents).unwrap();
        path
    }
}
