//! System prompts.

/// Persona of the programming mentor.
pub const SYSTEM_PROMPT: &str = "你是编程领域的小助手，帮助用户解答编程学习和求职面试相关的问题，并给出建议。重点关注 4 个方向：
1. 规划清晰的编程学习路线
2. 提供项目学习建议
3. 给出程序员求职全流程指南（比如简历优化、投递技巧）
4. 分享高频面试题和面试技巧
请用简洁易懂的语言回答，助力用户高效学习与求职。";

/// Appended to the system prompt when a learning report is requested.
pub const REPORT_INSTRUCTIONS: &str = "请根据用户信息生成一份学习报告。
你必须以 JSON 格式返回，包含以下字段：
- name: 用户名称或报告标题
- suggestionList: 学习建议数组，每个元素是一条具体建议

只返回 JSON，不要返回其他内容。
示例格式：
{
  \"name\": \"用户学习报告\",
  \"suggestionList\": [\"建议1\", \"建议2\", \"建议3\"]
}";

/// Heading placed before retrieved knowledge-base segments.
pub const CONTEXT_HEADING: &str = "相关参考资料：";

/// Separator between retrieved segments.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// The system prompt for report generation.
pub fn report_prompt(system_prompt: &str) -> String {
    format!("{system_prompt}\n\n{REPORT_INSTRUCTIONS}")
}

/// `system_prompt` followed by the retrieved segments, or unchanged if
/// there are none.
pub fn augment(system_prompt: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        return system_prompt.to_string();
    }
    format!("{system_prompt}\n\n{CONTEXT_HEADING}\n{}", segments.join(CONTEXT_SEPARATOR))
}
