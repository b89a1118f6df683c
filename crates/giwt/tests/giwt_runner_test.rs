use std::collections::VecDeque;

use giwt::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct EmptyQueue(&'static str);

fn pop(queue: &VecDeque<i32>) -> Result<i32, EmptyQueue> {
    queue.front().copied().ok_or(EmptyQueue("queue is empty"))
}

giwt::giwt_main! {
    class Queue in "collections" {
        source pushes { TestParameters::of([(1, 1), (3, 3), (7, 7)]) }

        test pops_the_front "pops the front element" (tc: TestCase<VecDeque<i32>, i32>) {
            tc.given("a queue of 1, 2", || VecDeque::from([1, 2]))?
                .and("with 3 pushed", |mut queue| {
                    queue.push_back(3);
                    queue
                })
                .try_when("popping", pop)
                .then("is 1", |r| r.should_be(ExpectedToBe::equal_to(1)).verify())
                .and("is positive", |r| r.should_be(ExpectedToBe::greater_than(0)).verify());
        }

        test fails_when_empty (tc: TestCase<VecDeque<i32>, i32>) {
            tc.given("an empty queue", VecDeque::new)?
                .try_when("popping", pop)
                .then("fails", |r| {
                    r.should_fail()
                        .and(ExpectedToFail::with_type::<EmptyQueue>())
                        .and(ExpectedToFail::with_message("queue is empty"))
                        .verify()
                });
        }

        parameterized pops_what_was_pushed "push {0}, pop {1}" from pushes
            (tc: TestCase<VecDeque<i32>, i32>, pushed: i32, popped: i32) {
            tc.given("an empty queue", VecDeque::new)?
                .and("with a value pushed", move |mut queue| {
                    queue.push_back(pushed);
                    queue
                })
                .try_when("popping", pop)
                .then("is the pushed value", move |r| {
                    r.should_be(ExpectedToBe::equal_to(popped)).verify()
                });
        }

        test "is skipped while unsupported" skipped("priority queues are not modelled") (tc: TestCase<(), ()>) {
            tc.when_run("prioritizing", || {})?
                .then("never runs", |_| ());
        }
    }

    class Text {
        test measures_words (tc: TestCase<String, Vec<String>>) {
            tc.given("a sentence", || "given when then".to_string())?
                .when("splitting", |s| s.split(' ').map(str::to_string).collect())
                .then("has three words", |r| r.should_have(ExpectedToHave::size(3)).verify())
                .and("has when", |r| {
                    r.should_have(ExpectedToHave::an_item_equal_to("when".to_string())).verify()
                });
        }

        test matches_a_predicate (tc: TestCase<String, String>) {
            tc.given("a word", || "giwt".to_string())?
                .when("uppercasing", |s| s.to_uppercase())
                .then("is uppercase", |r| {
                    r.should_match(ExpectedToMatch::one(matching("all uppercase", |s: &String| {
                        s.chars().all(char::is_uppercase)
                    })))
                    .verify()
                });
        }
    }
}
