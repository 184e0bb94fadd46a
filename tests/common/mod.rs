use std::path::Path;

/// Rows of a results CSV as (header, cells) pairs.
pub fn read_results(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
  let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path).expect("open results csv");
  let headers = rdr.headers().expect("headers").iter().map(String::from).collect();
  let rows = rdr
    .records()
    .map(|r| r.expect("record").iter().map(String::from).collect())
    .collect();
  (headers, rows)
}

/// Cell of `column` in the row for `project`.
pub fn cell(path: &Path, project: &str, column: &str) -> Option<String> {
  let (headers, rows) = read_results(path);
  let idx = headers.iter().position(|h| h == column)?;
  rows.into_iter().find(|r| r[0] == project).and_then(|r| r.get(idx).cloned())
}
