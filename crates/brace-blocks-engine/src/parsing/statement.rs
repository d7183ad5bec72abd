/// True if `statement` contains an `=` that is not nested inside
/// parentheses.
///
/// `var x = new Foo {` and `x => {` qualify; `if (a == b) {` does not.
pub fn contains_top_level_equals(statement: &str) -> bool {
    let mut depth = 0i32;
    for c in statement.chars() {
        match c {
            '=' if depth == 0 => return true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("var x = new Foo", true)]
    #[case("items.ForEach(x => ", false)]
    #[case("Func<int> f = () =>", true)]
    #[case("if (a == b)", false)]
    #[case("while ((c = Read()) != 0)", false)]
    #[case("public void Foo()", false)]
    #[case("", false)]
    fn detects_equals_outside_parentheses(#[case] statement: &str, #[case] expected: bool) {
        assert_eq!(contains_top_level_equals(statement), expected);
    }
}
