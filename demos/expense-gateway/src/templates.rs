//! HTML templates using maud.

use expense_approval::{ExpenseRequest, ExpenseStatus};
use maud::{html, Markup, PreEscaped, DOCTYPE};

const CSS: &str = r#"
body { font-family: sans-serif; margin: 2rem; }
table { border-collapse: collapse; min-width: 32rem; }
th, td { border: 1px solid #ccc; padding: 0.4rem 0.8rem; text-align: left; }
th { background: #f4f4f4; }
a.approve { color: #1a7f37; }
a.reject { color: #cf222e; }
.empty { color: #888; }
"#;

/// Base layout
pub fn layout(title: &str, content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Expense list page
pub fn expense_list(expenses: &[ExpenseRequest]) -> Markup {
    let content = html! {
        h1 { "SAMPLE EXPENSE SYSTEM" }
        p { a href="/list" { "HOME" } " | " a href="/new" { "NEW EXPENSE" } }
        h3 { "All expense requests:" }
        table {
            thead {
                tr {
                    th { "Expense ID" }
                    th { "Status" }
                    th { "Action" }
                }
            }
            tbody {
                @for expense in expenses {
                    (expense_row(expense))
                }
                @if expenses.is_empty() {
                    tr { td colspan="3" class="empty" { "No expense requests" } }
                }
            }
        }
    };
    layout("Expenses", &content)
}

fn action_href(action: &str, id: &str) -> String {
    format!("/action?type={}&id={}", action, urlencoding::encode(id))
}

fn expense_row(expense: &ExpenseRequest) -> Markup {
    html! {
        tr {
            td { (expense.id) }
            td { (expense.status) }
            td {
                @if expense.status == ExpenseStatus::Created {
                    a class="approve" href=(action_href("approve", &expense.id)) { "APPROVE" }
                    " "
                    a class="reject" href=(action_href("reject", &expense.id)) { "REJECT" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_created_rows_have_actions() {
        let page = expense_list(&[
            ExpenseRequest {
                id: "a".into(),
                status: ExpenseStatus::Created,
            },
            ExpenseRequest {
                id: "b".into(),
                status: ExpenseStatus::Completed,
            },
        ])
        .into_string();

        assert!(page.contains("/action?type=approve&"));
        assert!(page.contains("/action?type=reject&"));
        assert!(page.contains("id=a\""));
        assert!(!page.contains("id=b\""));
        assert!(page.contains("COMPLETED"));
    }

    #[test]
    fn test_action_links_encode_id() {
        let page = expense_list(&[ExpenseRequest {
            id: "a&b c".into(),
            status: ExpenseStatus::Created,
        }])
        .into_string();

        assert!(page.contains("id=a%26b%20c\""));
        assert!(page.contains("<td>a&amp;b c</td>"));
    }

    #[test]
    fn test_empty_list() {
        let page = expense_list(&[]).into_string();
        assert!(page.contains("No expense requests"));
    }
}
