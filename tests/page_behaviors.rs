use page_behaviors::{BehaviorConfig, Dom, Error, Page, Result, TimerTask};

const BASE_HTML: &str = r#"
<!DOCTYPE html>
<html>
<body>
  <div class="messages">
    <div class="alert alert-success" id="saved">Your post has been saved.</div>
    <div class="alert alert-info" id="welcome">Welcome back, ann!</div>
  </div>
  <article id="post">
    <h2>First post</h2>
    <a class="btn btn-secondary" id="edit" href="/post/1/update/">Edit</a>
    <button class="btn btn-danger" id="delete-wrapper"><a id="delete-link" href="/post/1/delete/">Delete</a></button>
  </article>
  <form method="post" action="/post/1/delete/" id="delete-form">
    <input type="hidden" name="csrfmiddlewaretoken" value="tok">
    <button type="submit" class="btn btn-danger" id="confirm-delete">Yes, delete</button>
  </form>
  <form method="post" action="/post/new/" id="post-form">
    <input type="hidden" name="csrfmiddlewaretoken" value="tok">
    <p><label for="id_title">Title:</label>
       <input type="text" name="title" class="form-control" required id="id_title"></p>
    <p><label for="id_content">Content:</label>
       <textarea name="content" class="form-control" required id="id_content"></textarea></p>
    <p><label for="id_tags">Tags:</label>
       <input type="text" name="tags_input" class="form-control" id="id_tags"></p>
    <button type="submit" class="btn btn-primary" id="save">Save</button>
  </form>
</body>
</html>
"#;

#[test]
fn notices_fade_at_5000ms_and_hide_at_5300ms() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    assert_eq!(page.install_summary().notices, 2);

    page.advance_time(4999)?;
    page.assert_style("#saved", "opacity", "")?;
    page.assert_style("#welcome", "opacity", "")?;

    page.advance_time(1)?;
    page.assert_style("#saved", "opacity", "0")?;
    page.assert_style("#welcome", "opacity", "0")?;
    page.assert_style("#saved", "display", "")?;

    page.advance_time_to(5299)?;
    page.assert_style("#saved", "display", "")?;

    page.advance_time_to(5300)?;
    page.assert_style("#saved", "display", "none")?;
    page.assert_style("#welcome", "display", "none")?;
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn one_large_advance_runs_both_phases() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.advance_time(10_000)?;
    page.assert_style("#saved", "opacity", "0")?;
    page.assert_style("#saved", "display", "none")?;
    assert_eq!(page.now_ms(), 10_000);
    Ok(())
}

#[test]
fn flush_and_run_next_timer_move_the_clock() -> Result<()> {
    let mut page = Page::from_html("<div class='alert' id='n'>x</div>")?;
    assert!(page.run_next_timer()?);
    assert_eq!(page.now_ms(), 5000);
    page.assert_style("#n", "opacity", "0")?;
    let pending = page.pending_timers();
    assert_eq!(pending.len(), 1);
    assert!(matches!(pending[0].task, TimerTask::HideNotice(_)));
    assert_eq!(pending[0].due_at, 5300);

    page.flush()?;
    assert_eq!(page.now_ms(), 5300);
    page.assert_style("#n", "display", "none")?;
    assert!(!page.run_next_timer()?);
    Ok(())
}

#[test]
fn notices_added_after_install_are_not_dismissed() -> Result<()> {
    let mut page = Page::from_html("<div id='box'></div>")?;
    assert!(page.pending_timers().is_empty());
    page.advance_time(6000)?;
    page.assert_style("#box", "display", "")?;
    Ok(())
}

#[test]
fn leaving_the_page_drops_pending_dismissals() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    assert_eq!(page.clear_all_timers(), 2);
    page.advance_time(6000)?;
    page.assert_style("#saved", "opacity", "")?;
    Ok(())
}

#[test]
fn declining_delete_link_prevents_navigation() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.dialogs_mut().enqueue_confirm_response(false);

    page.click("#delete-link")?;
    assert!(page.navigations().is_empty());
    assert_eq!(
        page.dialogs().confirm_messages(),
        ["Are you sure you want to delete this post?"]
    );

    page.dialogs_mut().enqueue_confirm_response(true);
    page.click("#delete-link")?;
    assert_eq!(page.navigations().len(), 1);
    assert_eq!(page.navigations()[0].href, "/post/1/delete/");
    Ok(())
}

#[test]
fn declining_delete_button_prevents_form_submission() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.dialogs_mut().set_default_confirm_response(false);
    page.click("#confirm-delete")?;
    assert!(page.submissions().is_empty());

    page.dialogs_mut().set_default_confirm_response(true);
    page.click("#confirm-delete")?;
    assert_eq!(page.submissions().len(), 1);
    let submission = &page.submissions()[0];
    assert_eq!(submission.action, "/post/1/delete/");
    assert_eq!(submission.method, "post");
    assert_eq!(submission.field("csrfmiddlewaretoken"), Some("tok"));
    assert!(page.dialogs().alert_messages().is_empty());
    Ok(())
}

#[test]
fn non_danger_controls_never_prompt() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.dialogs_mut().set_default_confirm_response(false);
    page.click("#edit")?;
    assert!(page.dialogs().confirm_messages().is_empty());
    assert_eq!(page.navigations()[0].href, "/post/1/update/");
    Ok(())
}

#[test]
fn empty_title_blocks_submission_until_filled() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.type_text("#id_content", "Some body")?;

    page.click("#save")?;
    assert!(page.submissions().is_empty());
    assert_eq!(
        page.dialogs().alert_messages(),
        ["Please fill in all required fields."]
    );
    page.assert_count("#post-form .error-message", 1)?;
    page.assert_text("#id_title + .error-message", "This field is required")?;
    page.assert_style("#id_title + .error-message", "color", "#dc3545")?;
    page.assert_style("#id_title + .error-message", "margin-top", "5px")?;
    page.assert_style("#id_title", "border-color", "#dc3545")?;
    page.assert_style("#id_content", "border-color", "#28a745")?;

    page.type_text("#id_title", "Hello")?;
    page.click("#save")?;
    page.assert_count("#post-form .error-message", 0)?;
    page.assert_style("#id_title", "border-color", "#28a745")?;
    assert_eq!(page.dialogs().alert_messages().len(), 1);

    assert_eq!(page.submissions().len(), 1);
    let submission = &page.submissions()[0];
    assert_eq!(submission.action, "/post/new/");
    assert_eq!(submission.field("title"), Some("Hello"));
    assert_eq!(submission.field("content"), Some("Some body"));
    assert_eq!(submission.field("tags_input"), Some(""));
    Ok(())
}

#[test]
fn repeated_invalid_submissions_keep_one_indicator_per_field() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    for _ in 0..4 {
        page.submit("#post-form")?;
    }
    page.assert_count("#post-form .error-message", 2)?;
    page.assert_count("#id_title + .error-message", 1)?;
    page.assert_count("#id_content + .error-message", 1)?;
    assert_eq!(page.dialogs().alert_messages().len(), 4);
    assert!(page.submissions().is_empty());
    Ok(())
}

#[test]
fn whitespace_only_value_is_invalid() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.type_text("#id_title", "   ")?;
    page.type_text("#id_content", "\n\t ")?;
    page.submit("#save")?;
    page.assert_count("#post-form .error-message", 2)?;
    Ok(())
}

#[test]
fn optional_fields_are_never_inspected() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.type_text("#id_title", "Title")?;
    page.type_text("#id_content", "Body")?;
    page.click("#save")?;
    page.assert_style("#id_tags", "border-color", "")?;
    page.assert_count("#id_tags + .error-message", 0)?;
    assert_eq!(page.submissions().len(), 1);
    Ok(())
}

#[test]
fn form_without_required_fields_submits_silently() -> Result<()> {
    let mut page = Page::from_html(
        r#"<form id="search" action="/search/"><input name="q"><button id="go">Go</button></form>"#,
    )?;
    page.click("#go")?;
    assert_eq!(page.submissions().len(), 1);
    assert_eq!(page.submissions()[0].method, "get");
    assert!(page.dialogs().alert_messages().is_empty());
    Ok(())
}

#[test]
fn behaviors_are_independent_of_each_other() -> Result<()> {
    let form_only = r#"
        <form id="f" action="/c/"><textarea id="c" name="content" required></textarea><button id="send">Send</button></form>
    "#;
    let everything = format!(
        r#"<div class="alert">Hi</div><a class="btn-danger" href="/x">x</a>{form_only}"#
    );

    let mut plain = Page::from_html(form_only)?;
    let mut busy = Page::from_html(&everything)?;
    busy.dialogs_mut().set_default_confirm_response(false);

    for page in [&mut plain, &mut busy] {
        page.click("#send")?;
        page.assert_count("#f .error-message", 1)?;
        page.type_text("#c", "Nice post")?;
        page.click("#send")?;
        page.assert_count("#f .error-message", 0)?;
        assert_eq!(page.submissions().len(), 1);
        assert!(page.dialogs().confirm_messages().is_empty());
    }

    busy.advance_time(5300)?;
    busy.assert_style(".alert", "display", "none")?;
    busy.assert_style("#c", "border-color", "#28a745")?;
    Ok(())
}

#[test]
fn custom_config_changes_delays_and_text() -> Result<()> {
    let config = BehaviorConfig {
        notice_fade_delay_ms: 1000,
        notice_hide_delay_ms: 50,
        required_alert_message: "Missing fields".into(),
        notice_selector: ".toast".into(),
        ..BehaviorConfig::default()
    };
    let mut page = Page::from_html_with_config(
        r#"<div class="toast" id="t">x</div><div class="alert" id="a">y</div>
           <form id="f"><input id="i" required></form>"#,
        config,
    )?;
    page.advance_time(1050)?;
    page.assert_style("#t", "display", "none")?;
    page.assert_style("#a", "display", "")?;

    page.submit("#f")?;
    assert_eq!(page.dialogs().alert_messages(), ["Missing fields"]);
    Ok(())
}

#[test]
fn disabled_controls_ignore_clicks() -> Result<()> {
    let mut page = Page::from_html(
        r#"<form id="f"><button class="btn-danger" id="b" disabled>Delete</button></form>"#,
    )?;
    page.click("#b")?;
    assert!(page.dialogs().confirm_messages().is_empty());
    assert!(page.submissions().is_empty());
    Ok(())
}

#[test]
fn hand_built_dom_submits_filled_textarea() -> Result<()> {
    let mut dom = Dom::new();
    let form = dom.create_element(
        dom.root(),
        "form",
        vec![
            ("id".into(), "f".into()),
            ("action".into(), "/post/1/comment/".into()),
            ("method".into(), "post".into()),
        ],
    )?;
    let area = dom.create_element(
        form,
        "textarea",
        vec![
            ("id".into(), "body".into()),
            ("name".into(), "content".into()),
            ("required".into(), String::new()),
        ],
    )?;
    dom.create_text(area, "Hello body")?;

    let mut page = Page::from_dom(dom)?;
    assert_eq!(page.install_summary().forms, 1);
    page.assert_value("#body", "Hello body")?;
    page.submit("#f")?;

    assert!(page.dialogs().alert_messages().is_empty());
    page.assert_style("#body", "border-color", "#28a745")?;
    assert_eq!(page.submissions().len(), 1);
    assert_eq!(page.submissions()[0].field("content"), Some("Hello body"));
    Ok(())
}

#[test]
fn unmatched_choice_leaves_required_select_empty() -> Result<()> {
    let mut page = Page::from_html(
        r#"<form id="f" action="/post/new/">
             <select id="s" name="category" required>
               <option value="a">A</option><option value="b">B</option>
             </select>
           </form>"#,
    )?;
    page.assert_value("#s", "a")?;
    page.type_text("#s", "zzz")?;
    page.assert_value("#s", "")?;
    page.submit("#f")?;
    assert!(page.submissions().is_empty());
    page.assert_exists("#s + .error-message")?;

    page.type_text("#s", "b")?;
    page.submit("#f")?;
    assert_eq!(page.submissions()[0].field("category"), Some("b"));
    Ok(())
}

#[test]
fn harness_assertions_and_dump_reflect_the_dom() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    page.assert_exists("#post-form")?;
    page.assert_value("#id_title", "")?;
    page.type_text("#id_title", "Draft")?;
    page.assert_value("#id_title", "Draft")?;

    page.submit("#post-form")?;
    let dump = page.dump_dom("#id_content + .error-message")?;
    assert_eq!(
        dump,
        "<div class=\"error-message\" style=\"color: #dc3545; font-size: 0.875rem; margin-top: 5px;\">This field is required</div>"
    );

    assert!(matches!(
        page.assert_exists("#id_title + .error-message"),
        Err(Error::SelectorNotFound(_))
    ));
    assert!(matches!(
        page.assert_value("#id_title", "Final"),
        Err(Error::AssertionFailed { .. })
    ));
    assert!(matches!(
        page.dump_dom("#nothing"),
        Err(Error::SelectorNotFound(_))
    ));
    Ok(())
}

#[test]
fn user_action_errors_are_reported() -> Result<()> {
    let mut page = Page::from_html(BASE_HTML)?;
    assert_eq!(
        page.click("#missing"),
        Err(Error::SelectorNotFound("#missing".into()))
    );
    assert!(matches!(
        page.type_text("#post", "x"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(page.advance_time(-1), Err(Error::Timer(_))));
    assert!(matches!(
        page.assert_text("#saved", "nope"),
        Err(Error::AssertionFailed { .. })
    ));
    assert!(matches!(
        page.click("div["),
        Err(Error::UnsupportedSelector(_))
    ));
    Ok(())
}

#[test]
fn invalid_config_is_rejected_at_load() {
    let config = BehaviorConfig {
        error_class: String::new(),
        ..BehaviorConfig::default()
    };
    assert!(matches!(
        Page::from_html_with_config("<p></p>", config),
        Err(Error::Config(_))
    ));
}
