// Shared by several bench targets; each one only uses part of it.
#[allow(dead_code)]
pub fn generate_source(classes: usize) -> String {
    let class = r#"namespace Demo
{
    public class Widget
    {
        private readonly string name = "{ not a block }";

        public void Render(Canvas canvas)
        {
            for (int i = 0; i < 10; ++i)
            {
                canvas.Draw(i, delegate { Log("drawn"); });
            }
            /* trailing { comment */
        }
    }
}
"#;
    class.repeat(classes)
}

#[allow(dead_code)]
pub fn generate_nested(depth: usize) -> String {
    let mut text = String::new();
    for level in 0..depth {
        text.push_str(&"    ".repeat(level));
        text.push_str(&format!("if (level{level})\n"));
        text.push_str(&"    ".repeat(level));
        text.push_str("{\n");
    }
    for level in (0..depth).rev() {
        text.push_str(&"    ".repeat(level));
        text.push_str("}\n");
    }
    text
}
