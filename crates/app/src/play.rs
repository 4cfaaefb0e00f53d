//! Line-oriented terminal front end over `CoursePlayerController`.

use course_core::Target;
use course_core::model::{AnswerValue, QuestionId, QuestionType, Quiz};
use services::player::OutlineQuiz;
use services::{
    CertificateView, Clock, CourseOutline, CoursePlayerController, FlowError, LayoutState,
    NoticeKind, PlayerState, QuizState, ViewMode,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  n | next                 next lesson or quiz
  p | prev                 previous stop
  c | complete             mark the open lesson complete
  o <section> <lesson>     open a lesson (1-based)
  q <section>              open a section quiz
  f | final                open the final quiz
  a <question> <answer>    answer a question (choice number, true/false, or text)
  s | submit               submit quiz answers
  r | retake               retake a failed quiz
  k | continue             continue after a passed quiz
  cert                     open the certificate
  e | enroll               enroll in this course
  refresh                  refetch enrollment
  sidebar <cols>           resize the sidebar
  chat [cols]              toggle or resize the chat panel
  h | help                 this text
  x | quit                 leave the player";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Previous,
    Complete,
    Open(Target),
    Answer(usize, String),
    Submit,
    Retake,
    Continue,
    Certificate,
    Enroll,
    Refresh,
    Sidebar(u16),
    Chat(Option<u16>),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let mut words = line.split_whitespace();
    let cmd = words.next()?;
    let mut index = || {
        words
            .next()
            .and_then(|w| w.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
    };
    let input = match cmd {
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Previous,
        "c" | "complete" => Input::Complete,
        "o" | "open" => {
            let section = index()?;
            let lesson = index()?;
            Input::Open(Target::Lesson { section, lesson })
        }
        "q" | "quiz" => Input::Open(Target::SectionQuiz { section: index()? }),
        "f" | "final" => Input::Open(Target::FinalQuiz),
        "a" | "answer" => {
            let question = index()?;
            let rest = line
                .split_whitespace()
                .skip(2)
                .collect::<Vec<_>>()
                .join(" ");
            if rest.is_empty() {
                return None;
            }
            Input::Answer(question, rest)
        }
        "s" | "submit" => Input::Submit,
        "r" | "retake" => Input::Retake,
        "k" | "continue" => Input::Continue,
        "cert" | "certificate" => Input::Certificate,
        "e" | "enroll" => Input::Enroll,
        "refresh" => Input::Refresh,
        "sidebar" => Input::Sidebar(words.next()?.parse().ok()?),
        "chat" => Input::Chat(words.next().and_then(|w| w.parse().ok())),
        "h" | "help" | "?" => Input::Help,
        "x" | "quit" | "exit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

fn answer_value(question_kind: QuestionType, raw: &str) -> Option<AnswerValue> {
    match question_kind {
        QuestionType::MultipleChoice => raw
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .map(AnswerValue::Choice),
        QuestionType::TrueFalse => match raw.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" => Some(AnswerValue::Bool(true)),
            "f" | "false" | "n" | "no" => Some(AnswerValue::Bool(false)),
            _ => None,
        },
        QuestionType::ShortAnswer | QuestionType::Coding => Some(AnswerValue::Text(raw.into())),
    }
}

fn resolve_answer(quiz: &Quiz, index: usize, raw: &str) -> Option<(QuestionId, AnswerValue)> {
    let question = quiz.questions().get(index)?;
    let value = answer_value(question.kind(), raw)?;
    Some((question.id().clone(), value))
}

/// Runs the player until the learner quits or stdin closes.
///
/// # Errors
///
/// Only I/O errors on stdin end the loop early; player failures are shown as
/// notices.
pub async fn run(player: &mut CoursePlayerController) -> std::io::Result<()> {
    let mut layout = LayoutState::new();
    if let Err(err) = player.load().await {
        debug!(error = %err, "initial load failed");
    }
    render(player, &layout);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_input(&line) else {
            if !line.trim().is_empty() {
                println!("Unrecognized command. Type `help` for the list.");
            }
            continue;
        };
        if input == Input::Quit {
            break;
        }
        if let Err(err) = dispatch(player, &mut layout, input).await {
            debug!(error = %err, "command failed");
        }
        render(player, &layout);
    }
    Ok(())
}

async fn dispatch(
    player: &mut CoursePlayerController,
    layout: &mut LayoutState,
    input: Input,
) -> Result<(), FlowError> {
    match input {
        Input::Next => player.next().await.map(drop),
        Input::Previous => player.previous().await.map(drop),
        Input::Complete => player.complete_current_lesson().await.map(drop),
        Input::Open(target) => player.open(target).await.map(drop),
        Input::Answer(index, raw) => {
            let resolved = player
                .quiz_flow()
                .and_then(|flow| flow.quiz())
                .and_then(|quiz| resolve_answer(quiz, index, &raw));
            match resolved {
                Some((question, value)) => player.answer(question, value),
                None => {
                    println!("No such question, or the answer does not fit it.");
                    Ok(())
                }
            }
        }
        Input::Submit => player.submit_quiz().await.map(drop),
        Input::Retake => player.retake_quiz(),
        Input::Continue => player.continue_after_quiz().await.map(drop),
        Input::Certificate => player.open_certificate().await.map(drop),
        Input::Enroll => player.enroll().await,
        Input::Refresh => player.refresh_enrollment().await.map(drop),
        Input::Sidebar(width) => {
            layout.resize_sidebar(width);
            Ok(())
        }
        Input::Chat(Some(width)) => {
            layout.resize_chat(width);
            Ok(())
        }
        Input::Chat(None) => {
            layout.toggle_chat();
            Ok(())
        }
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Quit => Ok(()),
    }
}

fn clip(text: &str, width: u16) -> String {
    let width = usize::from(width);
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn marker(completed: bool, unlocked: bool, current: bool) -> &'static str {
    match (current, completed, unlocked) {
        (true, _, _) => ">",
        (false, true, _) => "✓",
        (false, false, true) => " ",
        (false, false, false) => "🔒",
    }
}

fn render_quiz_line(label: &str, quiz: &OutlineQuiz, width: u16) {
    let score = quiz.score.map(|s| format!(" ({s}%)")).unwrap_or_default();
    let line = format!(
        "  {} {label}{score}",
        marker(quiz.passed, quiz.unlocked, quiz.current)
    );
    println!("{}", clip(&line, width));
}

fn render_outline(outline: &CourseOutline, width: u16) {
    println!("{}", clip(&format!("{} [{}%]", outline.title, outline.overall_percent), width));
    for (s, section) in outline.sections.iter().enumerate() {
        println!(
            "{}",
            clip(&format!("{}. {} [{}%]", s + 1, section.title, section.percent), width)
        );
        for (l, lesson) in section.lessons.iter().enumerate() {
            let line = format!(
                "  {} {}.{} {}",
                marker(lesson.completed, lesson.unlocked, lesson.current),
                s + 1,
                l + 1,
                lesson.title
            );
            println!("{}", clip(&line, width));
        }
        if let Some(quiz) = &section.quiz {
            render_quiz_line("Section quiz", quiz, width);
        }
    }
    if let Some(quiz) = &outline.final_quiz {
        render_quiz_line("Final quiz", quiz, width);
    }
}

fn render_lesson(player: &CoursePlayerController) {
    let Some(lesson) = player.current_lesson() else {
        return;
    };
    println!("== {} ==", lesson.title());
    if let Some(minutes) = lesson.duration_minutes() {
        println!("({minutes} min)");
    }
    let content = lesson.content();
    let body = content
        .as_str()
        .or_else(|| content.get("text").and_then(|v| v.as_str()))
        .or_else(|| content.get("body").and_then(|v| v.as_str()));
    match body {
        Some(body) => println!("{body}"),
        None if content.is_null() => {}
        None => println!("{content}"),
    }
    if player.lesson_flow().is_some_and(|flow| flow.is_submitting()) {
        println!("(saving…)");
    } else {
        println!("Type `complete` when you are done.");
    }
}

fn render_quiz(player: &CoursePlayerController) {
    let Some(flow) = player.quiz_flow() else {
        return;
    };
    match flow.state() {
        QuizState::Loading => println!("Loading quiz…"),
        QuizState::Unavailable(message) => println!("{message}"),
        QuizState::Submitting => println!("Grading…"),
        QuizState::Ready | QuizState::Answering => {
            let Some(quiz) = flow.quiz() else {
                return;
            };
            println!("== {} (pass at {}%) ==", quiz.title(), quiz.passing_score());
            if let Some(left) = flow.remaining(Clock::default_clock().now()) {
                println!("Time left: {} min", left.num_minutes());
            }
            for (i, question) in quiz.questions().iter().enumerate() {
                let answered = if flow.answers().get(question.id()).is_some() {
                    "*"
                } else {
                    " "
                };
                println!("{answered}{}. {}", i + 1, question.text());
                for (o, option) in question.options().iter().enumerate() {
                    println!("     {}) {option}", o + 1);
                }
            }
        }
        QuizState::Result(outcome) => {
            let verdict = if outcome.passed { "Passed" } else { "Not passed" };
            println!(
                "{verdict}: {}/{} (attempt {})",
                outcome.score, outcome.max_score, outcome.attempt_count
            );
            for feedback in outcome.results.iter().filter(|f| !f.is_correct) {
                let why = feedback.explanation.as_deref().unwrap_or("incorrect");
                println!("  {}: {why}", feedback.question_id);
            }
            if flow.can_continue() {
                println!("Type `continue` to move on.");
            } else if flow.can_retake() {
                println!("Type `retake` to try again.");
            }
        }
    }
}

fn render_certificate(view: &CertificateView) {
    match view.certificate() {
        Some(certificate) => {
            println!("== Certificate {} ==", certificate.id);
            if let Some(title) = &certificate.course_title {
                println!("Course: {title}");
            }
            if let Some(name) = &certificate.learner_name {
                println!("Awarded to: {name}");
            }
            if view.can_print() {
                if let Some(code) = &certificate.verification_code {
                    println!("Verification code: {code}");
                }
            }
        }
        None if matches!(view, CertificateView::Loading) => println!("Loading certificate…"),
        None => {}
    }
    if let Some(banner) = view.banner() {
        println!("{banner}");
    }
}

fn render(player: &mut CoursePlayerController, layout: &LayoutState) {
    println!();
    match player.state() {
        PlayerState::Loading => println!("Loading…"),
        PlayerState::Failed(err) => println!("{}", err.user_message()),
        PlayerState::SignedOut { suspended: true } => {
            println!("Your account is suspended. Run `app login` with a new session.");
        }
        PlayerState::SignedOut { suspended: false } => println!("Please sign in."),
        PlayerState::NotEnrolled => {
            if let Some(course) = player.course() {
                println!("{}", course.title());
            }
            println!("You are not enrolled. Type `enroll` to start.");
        }
        PlayerState::Ready => {
            if let Some(outline) = player.outline() {
                render_outline(&outline, layout.sidebar_width());
                println!("{}", "-".repeat(usize::from(layout.sidebar_width())));
            }
            match player.view_mode() {
                ViewMode::Lesson => render_lesson(player),
                ViewMode::Quiz => render_quiz(player),
                ViewMode::Certificate => {
                    if let Some(view) = player.certificate_view() {
                        render_certificate(view);
                    }
                }
            }
            if layout.chat_open() {
                println!("[chat panel · {} cols]", layout.chat_width());
            }
        }
    }

    for notice in player.drain_notices() {
        let tag = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Success => "ok",
            NoticeKind::Warning => "warn",
            NoticeKind::Error => "error",
        };
        println!("[{tag}] {}", notice.message);
    }
}
