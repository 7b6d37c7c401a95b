use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::serdable::GlobPattern;

#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error(transparent)]
    Fs(#[from] fsutil::Error),

    #[error("No answer file for case '{name}' (expected '{}')", .path.to_string_lossy())]
    MissingAnswer { name: String, path: PathBuf },
}

/// One (input, answer) pair sharing a filename across the input and answer dirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    name: String,
    input_path: PathBuf,
    answer_path: PathBuf,
    output_path: PathBuf,
}

/// Decides which directory entries are input cases.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    exclude: Vec<GlobPattern>,
}

/// Where captured outputs are persisted: `<dir>/<prefix><case filename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub prefix: String,
}

impl CaseFilter {
    pub fn new(exclude: impl IntoIterator<Item = GlobPattern>) -> Self {
        Self {
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn is_valid_input_file(&self, filename: &str) -> bool {
        !self.exclude.iter().any(|pat| pat.matches(filename))
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            dir: ".".into(),
            prefix: "output".to_owned(),
        }
    }
}

impl OutputLayout {
    pub fn output_path(&self, filename: impl Into<OsString>) -> PathBuf {
        let mut name = OsString::from(&self.prefix);
        name.push(filename.into());
        self.dir.join(name)
    }
}

impl Case {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        answer: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input.into(),
            answer_path: answer.into(),
            output_path: output.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn answer_path(&self) -> &Path {
        &self.answer_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// List every regular file of `input_dir` accepted by `filter`, paired with the
    /// same-named file of `answer_dir`. Sorted by filename.
    pub fn enumerate(
        input_dir: impl AsRef<Path>,
        answer_dir: impl AsRef<Path>,
        filter: &CaseFilter,
        layout: &OutputLayout,
    ) -> Result<Vec<Self>, CaseError> {
        let answer_dir = answer_dir.as_ref();
        let mut res = Vec::new();

        for entry in fsutil::read_dir_entries(&input_dir)? {
            let input_path = entry.path();
            if !input_path.is_file() {
                continue;
            }
            let filename = entry.file_name();
            let name = filename.to_string_lossy().into_owned();
            if !filter.is_valid_input_file(&name) {
                log::debug!("Skip {:?}", input_path);
                continue;
            }

            let answer_path = answer_dir.join(&filename);
            if !answer_path.is_file() {
                return Err(CaseError::MissingAnswer {
                    name,
                    path: answer_path,
                });
            }
            let output_path = layout.output_path(filename);
            res.push(Self::new(name, input_path, answer_path, output_path));
        }

        res.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::judge::fixture::write_file;

    fn ds_store_filter() -> CaseFilter {
        CaseFilter::new([GlobPattern::parse(".DS_Store").unwrap()])
    }

    #[test]
    fn enumerate_pairs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let (inp, ans) = (dir.path().join("in"), dir.path().join("ans"));
        for name in ["2.txt", "10.txt", "1.txt"] {
            write_file(&inp, name, "x\n");
            write_file(&ans, name, "y\n");
        }
        write_file(&inp, ".DS_Store", "junk");
        fsutil::mkdir_all(inp.join("subdir")).unwrap();

        let layout = OutputLayout {
            dir: dir.path().join("out"),
            prefix: "output".to_owned(),
        };
        let cases = Case::enumerate(&inp, &ans, &ds_store_filter(), &layout).unwrap();

        let names: Vec<_> = cases.iter().map(Case::name).collect();
        assert_eq!(names, ["1.txt", "10.txt", "2.txt"]);
        assert_eq!(cases[0].input_path(), inp.join("1.txt"));
        assert_eq!(cases[0].answer_path(), ans.join("1.txt"));
        assert_eq!(cases[0].output_path(), dir.path().join("out/output1.txt"));
    }

    #[test]
    fn missing_answer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (inp, ans) = (dir.path().join("in"), dir.path().join("ans"));
        write_file(&inp, "1.txt", "x\n");
        write_file(&inp, "2.txt", "x\n");
        write_file(&ans, "1.txt", "y\n");

        let err = Case::enumerate(&inp, &ans, &ds_store_filter(), &OutputLayout::default())
            .unwrap_err();
        assert!(matches!(err, CaseError::MissingAnswer { ref name, .. } if name == "2.txt"));
    }

    #[test]
    fn unreadable_input_dir_is_an_error() {
        let err = Case::enumerate(
            "/no/such/input",
            "/no/such/answer",
            &CaseFilter::default(),
            &OutputLayout::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CaseError::Fs(_)));
    }

    #[test]
    fn default_output_path_is_in_current_dir() {
        assert_eq!(
            OutputLayout::default().output_path("3.txt"),
            Path::new("./output3.txt")
        );
    }
}
