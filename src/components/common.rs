use serde_json::Value;

use crate::types::{Case, RuleError, DEFAULT_RELATION, OTHER_CASE};

/// 标签按字符串字面量写进脚本
fn quote(label: &str) -> String {
    Value::String(label.to_string()).to_string()
}

/// 拆分 case 列表：普通分支按声明顺序保留，other 分支单独取出。
/// case 与 then 先去除首尾空格，为空则视为致命配置错误
fn split_cases(cases: &[Case]) -> Result<(Vec<(String, String)>, Option<String>), RuleError> {
    let mut branches = Vec::new();
    let mut other = None;
    for item in cases {
        let case = item.case.trim();
        let then = item.then.trim();
        if case.is_empty() || then.is_empty() {
            return Err(RuleError::Config(
                "switch 的 case 与 then 不能为空".to_string(),
            ));
        }
        if case == OTHER_CASE {
            other = Some(then.to_string());
        } else {
            branches.push((case.to_string(), then.to_string()));
        }
    }
    Ok((branches, other))
}

/// 将有序 case 列表降级为一条表达式脚本，
/// 无 other 分支时落到 default 标签
pub fn expr_script_from_cases(cases: &[Case]) -> Result<String, RuleError> {
    if cases.is_empty() {
        return Err(RuleError::Config("switch 缺少 script 与 cases".to_string()));
    }
    let (branches, other) = split_cases(cases)?;
    let fallback = quote(other.as_deref().unwrap_or(DEFAULT_RELATION));
    if branches.is_empty() {
        return Ok(fallback);
    }
    let mut script = String::new();
    for (i, (case, then)) in branches.iter().enumerate() {
        if i > 0 {
            script.push_str(" else ");
        }
        script.push_str("if ");
        script.push_str(case);
        script.push_str(" { ");
        script.push_str(&quote(then));
        script.push_str(" }");
    }
    script.push_str(" else { ");
    script.push_str(&fallback);
    script.push_str(" }");
    Ok(script)
}

/// JS 版降级：嵌套三目
pub fn js_script_from_cases(cases: &[Case]) -> Result<String, RuleError> {
    if cases.is_empty() {
        return Err(RuleError::Config("switch 缺少 script 与 cases".to_string()));
    }
    let (branches, other) = split_cases(cases)?;
    let fallback = quote(other.as_deref().unwrap_or(DEFAULT_RELATION));
    let mut expr = String::new();
    for (case, then) in &branches {
        expr.push('(');
        expr.push_str(case);
        expr.push_str(") ? ");
        expr.push_str(&quote(then));
        expr.push_str(" : ");
    }
    expr.push_str(&fallback);
    Ok(format!("return {};", expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(case: &str, then: &str) -> Case {
        Case {
            case: case.to_string(),
            then: then.to_string(),
        }
    }

    #[test]
    fn expr_lowering_with_other() {
        let script = expr_script_from_cases(&[
            case("student == \"3\"", "A"),
            case("score > 75", "B"),
            case("other", "C"),
        ])
        .unwrap();
        assert_eq!(
            script,
            r#"if student == "3" { "A" } else if score > 75 { "B" } else { "C" }"#
        );
    }

    #[test]
    fn expr_lowering_without_other_falls_back_to_default() {
        let script = expr_script_from_cases(&[case("score > 60", "pass")]).unwrap();
        assert_eq!(script, r#"if score > 60 { "pass" } else { "default" }"#);
    }

    #[test]
    fn js_lowering() {
        let script = js_script_from_cases(&[
            case("msg.level === 'B'", "B"),
            case("other", "C"),
        ])
        .unwrap();
        assert_eq!(script, r#"return (msg.level === 'B') ? "B" : "C";"#);
    }

    #[test]
    fn components_are_trimmed() {
        let script = expr_script_from_cases(&[case("  score > 60  ", "  pass  ")]).unwrap();
        assert_eq!(script, r#"if score > 60 { "pass" } else { "default" }"#);
    }

    #[test]
    fn empty_component_is_fatal() {
        assert!(expr_script_from_cases(&[case("", "A")]).is_err());
        assert!(expr_script_from_cases(&[case("score > 1", "  ")]).is_err());
        assert!(expr_script_from_cases(&[]).is_err());
    }
}
