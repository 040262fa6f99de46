use std::collections::HashSet;

use agora_api::{CommentId, PostId, ProfileRow, Time, UserId, ViewerId};
use agora_mock_server::{CommentRecord, Fixture, LikeRecord};
use chrono::{Duration, Utc};
use rand::{rngs::ThreadRng, seq::SliceRandom, Rng};

const NUM_USERS: usize = 5;
const NUM_POSTS: usize = 3;
const NUM_GUEST_TOKENS: usize = 10;

const NUM_TOP_LEVEL: usize = 40;
const NUM_REPLIES: usize = 80;
const NUM_LIKES: usize = 150;

const COMMENT_WORD_COUNT: usize = 25;
const MAX_AGE_DAYS: i64 = 30;

const NICKNAMES: &[&str] = &["Visitor", "passerby", "anon42", "Reader"];

fn gen_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn gen_comment_text(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT))
}

fn main() {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    // Generate users, some of which never set up a profile
    let users = (0..NUM_USERS)
        .map(|_| UserId(gen_uuid()))
        .collect::<Vec<_>>();
    let mut profiles = Vec::new();
    for u in users.iter() {
        if !rng.gen_bool(0.7) {
            continue;
        }
        let avatar_url = match rng.gen_bool(0.5) {
            true => Some(format!("https://example.com/avatars/{}.png", u)),
            false => None,
        };
        profiles.push(ProfileRow {
            id: u.clone(),
            username: lipsum::lipsum_words(1).to_lowercase(),
            avatar_url,
        });
    }

    let posts = (0..NUM_POSTS)
        .map(|i| PostId(format!("post-{}", i)))
        .collect::<Vec<_>>();

    let gen_record = |rng: &mut ThreadRng,
                      post: PostId,
                      parent: Option<CommentId>,
                      created_at: Time| {
        let (user_id, guest_nickname) = match rng.gen_bool(0.5) {
            true => (users.choose(rng).cloned(), None),
            // some guests leave no nickname at all
            false => match rng.gen_bool(0.5) {
                true => (None, NICKNAMES.choose(rng).map(|n| n.to_string())),
                false => (None, None),
            },
        };
        CommentRecord {
            id: CommentId(gen_uuid()),
            post_id: post,
            parent_id: parent,
            user_id,
            guest_nickname,
            content: gen_comment_text(rng),
            created_at,
            updated_at: None,
            like_count: 0,
        }
    };

    // First generate top-level comments, as replies need them
    let mut comments = (0..NUM_TOP_LEVEL)
        .map(|_| {
            let post = posts[rng.gen_range(0..posts.len())].clone();
            let age = Duration::minutes(rng.gen_range(0..MAX_AGE_DAYS * 24 * 60));
            gen_record(&mut rng, post, None, now - age)
        })
        .collect::<Vec<_>>();
    let mut replies = Vec::with_capacity(NUM_REPLIES);
    for _ in 0..NUM_REPLIES {
        let parent = &comments[rng.gen_range(0..comments.len())];
        let age = now - parent.created_at;
        let delay = Duration::minutes(rng.gen_range(0..=age.num_minutes()));
        let (post, id) = (parent.post_id.clone(), parent.id.clone());
        let created_at = parent.created_at + delay;
        replies.push(gen_record(&mut rng, post, Some(id), created_at));
    }
    comments.append(&mut replies);

    // Likes come from both users and guests, and like_count must agree with them
    let likers = users
        .iter()
        .map(|u| ViewerId::from(u.clone()))
        .chain((0..NUM_GUEST_TOKENS).map(|_| ViewerId(gen_uuid())))
        .collect::<Vec<_>>();
    let mut likes = HashSet::new();
    for _ in 0..NUM_LIKES {
        let viewer = likers[rng.gen_range(0..likers.len())].clone();
        let comment = comments[rng.gen_range(0..comments.len())].id.clone();
        likes.insert((viewer, comment));
    }
    for c in comments.iter_mut() {
        c.like_count = likes.iter().filter(|(_, l)| *l == c.id).count() as u32;
    }

    let fixture = Fixture {
        profiles,
        comments,
        likes: likes
            .into_iter()
            .map(|(viewer, comment)| LikeRecord { viewer, comment })
            .collect(),
    };
    match serde_json::to_string_pretty(&fixture) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed serializing fixture: {}", e),
    }
}
