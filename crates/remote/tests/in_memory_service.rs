use exam_core::model::{
    AnswerOption, AnswerSubmission, AttemptId, Difficulty, ExamAttempt, OptionId, Question,
    QuestionId, SelectionMode, StartRequest, SubjectFilter, SubjectId,
};
use remote::memory::Operation;
use remote::{ExamService, ExamServiceError, InMemoryExamService};

fn attempt(id: &str) -> ExamAttempt {
    let question = |qid: u64| Question {
        id: QuestionId::new(qid),
        text: format!("Q{qid}"),
        options: vec![
            AnswerOption {
                id: OptionId::new(1),
                text: "A".into(),
            },
            AnswerOption {
                id: OptionId::new(2),
                text: "B".into(),
            },
        ],
        points: 2,
        difficulty: Difficulty::Easy,
        mode: SelectionMode::Single,
    };
    ExamAttempt::new(
        AttemptId::new(id),
        vec![question(1), question(2)],
        None,
        vec![SubjectId::new(1)],
    )
    .unwrap()
}

fn request() -> StartRequest {
    StartRequest {
        subject_selections: vec![SubjectFilter {
            subject_id: SubjectId::new(1),
            chapter_ids: None,
        }],
        question_count: 2,
        difficulty_filter: None,
        time_limit_minutes: None,
    }
}

#[tokio::test]
async fn start_then_submit_grades_against_answer_key() {
    let service = InMemoryExamService::new()
        .with_queued_attempt(attempt("a1"))
        .with_answer_key(QuestionId::new(1), &[OptionId::new(2)])
        .with_answer_key(QuestionId::new(2), &[OptionId::new(1)]);

    let started = service.start_attempt(&request()).await.unwrap();
    assert_eq!(service.active().map(|a| a.id().clone()), Some(started.id().clone()));

    let answers = vec![
        AnswerSubmission {
            question_id: QuestionId::new(1),
            selected_option_ids: vec![OptionId::new(2)],
        },
        AnswerSubmission {
            question_id: QuestionId::new(2),
            selected_option_ids: Vec::new(),
        },
    ];
    let result = service.submit_attempt(started.id(), &answers).await.unwrap();
    assert_eq!(result.correct_count(), 1);
    assert!((result.score - 2.0).abs() < f64::EPSILON);
    assert!((result.max_score - 4.0).abs() < f64::EPSILON);
    assert!(service.active().is_none());
}

#[tokio::test]
async fn only_one_active_attempt_at_a_time() {
    let service = InMemoryExamService::new()
        .with_queued_attempt(attempt("a1"))
        .with_queued_attempt(attempt("a2"));

    service.start_attempt(&request()).await.unwrap();
    let err = service.start_attempt(&request()).await.unwrap_err();
    assert!(matches!(err, ExamServiceError::Unavailable(_)));

    let active = service.active_attempt().await.unwrap().unwrap();
    assert_eq!(active.id().as_str(), "a1");
}

#[tokio::test]
async fn injected_failures_are_consumed() {
    let service = InMemoryExamService::new().with_queued_attempt(attempt("a1"));
    service.fail_next(Operation::Start, 1);

    assert!(service.start_attempt(&request()).await.is_err());
    assert!(service.start_attempt(&request()).await.is_ok());
    assert_eq!(service.start_requests().len(), 2);
}

#[tokio::test]
async fn cancel_clears_active_attempt() {
    let service = InMemoryExamService::new().with_active_attempt(attempt("a9"));
    service.cancel_attempt(&AttemptId::new("a9")).await.unwrap();
    assert!(service.active_attempt().await.unwrap().is_none());
    assert_eq!(service.cancelled(), vec![AttemptId::new("a9")]);
}
