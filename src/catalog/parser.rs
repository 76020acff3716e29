/// A test case pulled out of a suite file, with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteCase {
    pub name: String,
    /// 1-based line number.
    pub line: u32,
}

/// Extract test-case names from suite-file text.
///
/// Suite files use `*** Section Name ***` headers. Only sections named
/// "Test Cases" or "Tasks" (case-insensitive, singular accepted) define
/// cases; within one, every line that starts at column zero and is not a
/// `#` comment or a bracketed `[...]` setting is a case name. Indented
/// lines are the case's steps and are skipped.
pub fn parse_cases(content: &str) -> Vec<SuiteCase> {
    let mut cases = Vec::new();
    let mut in_cases = false;

    for (idx, line) in content.lines().enumerate() {
        if let Some(section) = section_name(line) {
            in_cases = opens_cases(&section);
            continue;
        }
        if !in_cases {
            continue;
        }
        if line.is_empty() || line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }
        let trimmed = line.trim_end();
        if trimmed.starts_with('#') || trimmed.starts_with('[') {
            continue;
        }
        cases.push(SuiteCase {
            name: trimmed.to_string(),
            line: idx as u32 + 1,
        });
    }

    cases
}

/// A header line starts with `***`; the section name is what remains once
/// the star fencing and surrounding whitespace are stripped.
fn section_name(line: &str) -> Option<String> {
    let trimmed = line.trim_end();
    if !trimmed.starts_with("***") {
        return None;
    }
    Some(trimmed.trim_matches(|c| c == '*' || c == ' ' || c == '\t').to_string())
}

fn opens_cases(section: &str) -> bool {
    let lower = section.to_lowercase();
    lower.starts_with("test case") || lower.starts_with("task")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(content: &str) -> Vec<String> {
        parse_cases(content).into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn extracts_names_and_skips_steps() {
        let content = "\
*** Test Cases ***
Valid Login
    Open Browser    ${URL}
    Input Text      username    admin
Invalid Password
    Input Text      password    wrong
";
        assert_eq!(names(content), vec!["Valid Login", "Invalid Password"]);
    }

    #[test]
    fn records_line_numbers() {
        let content = "*** Settings ***\nLibrary  Browser\n\n*** Test Cases ***\nFirst Case\n    Step\n";
        let cases = parse_cases(content);
        assert_eq!(cases, vec![SuiteCase { name: "First Case".into(), line: 5 }]);
    }

    #[test]
    fn ignores_other_sections() {
        let content = "\
*** Settings ***
Library    Browser
*** Keywords ***
Do Setup
    Log    setup
*** Test Cases ***
Only Case
    Log    run
*** Variables ***
${PORT}    8000
";
        assert_eq!(names(content), vec!["Only Case"]);
    }

    #[test]
    fn section_header_is_case_insensitive_and_accepts_tasks() {
        let content = "*** tasks ***\nNightly Sync\n    Run Sync\n";
        assert_eq!(names(content), vec!["Nightly Sync"]);
        let content = "*** TEST CASE ***\nSingular Header\n    Step\n";
        assert_eq!(names(content), vec!["Singular Header"]);
    }

    #[test]
    fn skips_comments_and_bracketed_lines() {
        let content = "\
*** Test Cases ***
# a comment about the suite
[Tags]    smoke
Real Case
    Step
";
        assert_eq!(names(content), vec!["Real Case"]);
    }

    #[test]
    fn empty_and_whitespace_lines_are_skipped() {
        let content = "*** Test Cases ***\n\n   \nCase A\n";
        assert_eq!(names(content), vec!["Case A"]);
    }

    #[test]
    fn no_case_section_means_no_cases() {
        let content = "*** Keywords ***\nLooks Like A Case\n    Step\n";
        assert!(parse_cases(content).is_empty());
    }
}
