use serde::Serialize;
use thiserror::Error;

use super::{PATHWAYS, Pathway};

#[derive(Debug, Serialize)]
pub struct Question {
    pub prompt: &'static str,
    pub answers: &'static [Answer],
}

/// `weights` follow the order of `PATHWAYS`.
#[derive(Debug, Serialize)]
pub struct Answer {
    pub text: &'static str,
    #[serde(skip)]
    pub weights: [u8; 4],
}

pub static QUESTIONS: [Question; 5] = [
    Question {
        prompt: "It's Friday night. Where do we find you?",
        answers: &[
            Answer {
                text: "Queued up with friends for ranked.",
                weights: [3, 0, 0, 0],
            },
            Answer {
                text: "Running a one-shot for my tabletop group.",
                weights: [0, 3, 0, 0],
            },
            Answer {
                text: "Finishing the side project I promised myself.",
                weights: [0, 0, 3, 0],
            },
            Answer {
                text: "Catching up on everything I missed this week.",
                weights: [0, 0, 0, 3],
            },
        ],
    },
    Question {
        prompt: "Pick a channel to lurk in.",
        answers: &[
            Answer {
                text: "#clips",
                weights: [2, 0, 0, 1],
            },
            Answer {
                text: "#worldbuilding",
                weights: [0, 2, 1, 0],
            },
            Answer {
                text: "#focus-room",
                weights: [0, 0, 2, 0],
            },
            Answer {
                text: "#announcements",
                weights: [0, 0, 0, 2],
            },
        ],
    },
    Question {
        prompt: "What would you bring to a community event?",
        answers: &[
            Answer {
                text: "A bracket and a trash-talk playlist.",
                weights: [2, 0, 0, 0],
            },
            Answer {
                text: "A map of a kingdom nobody has heard of.",
                weights: [0, 2, 0, 0],
            },
            Answer {
                text: "A shared to-do list and a timer.",
                weights: [0, 0, 2, 0],
            },
            Answer {
                text: "A recap thread so nobody misses anything.",
                weights: [0, 1, 0, 2],
            },
        ],
    },
    Question {
        prompt: "Your favourite kind of win is...",
        answers: &[
            Answer {
                text: "Clutching the last round.",
                weights: [3, 0, 0, 0],
            },
            Answer {
                text: "A plot twist nobody saw coming.",
                weights: [0, 3, 0, 0],
            },
            Answer {
                text: "Inbox zero.",
                weights: [0, 0, 3, 0],
            },
            Answer {
                text: "Being first to share the big news.",
                weights: [0, 0, 0, 3],
            },
        ],
    },
    Question {
        prompt: "How much time do you spend in the Conclave?",
        answers: &[
            Answer {
                text: "Every evening, headset on.",
                weights: [1, 0, 0, 0],
            },
            Answer {
                text: "Whenever a story needs telling.",
                weights: [0, 1, 0, 0],
            },
            Answer {
                text: "During co-working sessions.",
                weights: [0, 0, 1, 0],
            },
            Answer {
                text: "A quick skim every morning.",
                weights: [0, 0, 0, 1],
            },
        ],
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("expected {expected} answers, got {actual}")]
    WrongAnswerCount { expected: usize, actual: usize },
    #[error("question {question} has no answer {answer}")]
    UnknownAnswer { question: usize, answer: usize },
}

#[derive(Debug, Serialize)]
pub struct PathwayScore {
    pub pathway: &'static str,
    pub score: u32,
}

#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub pathway: &'static Pathway,
    pub scores: Vec<PathwayScore>,
}

/// Scores one answer index per question. Ties go to the pathway listed first.
pub fn score(answers: &[usize]) -> Result<QuizResult, QuizError> {
    if answers.len() != QUESTIONS.len() {
        return Err(QuizError::WrongAnswerCount {
            expected: QUESTIONS.len(),
            actual: answers.len(),
        });
    }

    let mut totals = [0u32; 4];
    for (question_index, (question, &answer_index)) in QUESTIONS.iter().zip(answers).enumerate() {
        let answer = question
            .answers
            .get(answer_index)
            .ok_or(QuizError::UnknownAnswer {
                question: question_index,
                answer: answer_index,
            })?;
        for (total, weight) in totals.iter_mut().zip(answer.weights) {
            *total += u32::from(weight);
        }
    }

    let mut winner = 0;
    for (index, total) in totals.iter().enumerate() {
        if *total > totals[winner] {
            winner = index;
        }
    }

    Ok(QuizResult {
        pathway: &PATHWAYS[winner],
        scores: PATHWAYS
            .iter()
            .zip(totals)
            .map(|(pathway, score)| PathwayScore {
                pathway: pathway.slug,
                score,
            })
            .collect(),
    })
}
