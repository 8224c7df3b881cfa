pub struct Styler {
    color_enabled: bool,
}

impl Styler {
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    fn wrap(&self, code: &str, s: &str) -> String {
        if !self.color_enabled {
            return s.to_string();
        }
        format!("{}{}\u{001b}[0m", code, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.wrap("\u{001b}[32m", s)
    }

    pub fn red(&self, s: &str) -> String {
        self.wrap("\u{001b}[31m", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.wrap("\u{001b}[90m", s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.wrap("\u{001b}[1m", s)
    }
}

fn pad_right(s: &str, width: usize) -> String {
    let w = s.chars().count();
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

/// Left-aligned columns separated by two spaces. Cells must be plain text.
pub fn render_simple_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            let w = cell.chars().count();
            match widths.get_mut(i) {
                Some(cur) => *cur = (*cur).max(w),
                None => widths.push(w),
            }
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| pad_right(c, widths[i]))
            .collect::<Vec<String>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.to_vec())];
    for row in rows.iter() {
        lines.push(render_row(row.iter().map(|s| s.as_str()).collect()));
    }
    lines.join("\n")
}

pub fn render_progress_bar(done: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return "-".repeat(width);
    }
    let filled = ((done as f64 / total as f64) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_line_up() {
        let table = render_simple_table(
            &["day", "status"],
            &[
                vec!["1".to_string(), "completed".to_string()],
                vec!["12".to_string(), "active".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "day  status");
        assert_eq!(lines[1], "1    completed");
        assert_eq!(lines[2], "12   active");
    }

    #[test]
    fn header_only_table_when_no_rows() {
        assert_eq!(render_simple_table(&["day", "status"], &[]), "day  status");
    }

    #[test]
    fn progress_bar_rounds_and_clamps() {
        assert_eq!(render_progress_bar(0, 6, 6), "░░░░░░");
        assert_eq!(render_progress_bar(3, 6, 6), "███░░░");
        assert_eq!(render_progress_bar(6, 6, 6), "██████");
        assert_eq!(render_progress_bar(1, 0, 3), "---");
    }

    #[test]
    fn styler_is_transparent_without_color() {
        let s = Styler::new(false);
        assert_eq!(s.green("ok"), "ok");
        assert_eq!(s.red("no"), "no");
        assert!(Styler::new(true).green("ok").starts_with("\u{001b}[32m"));
    }
}
