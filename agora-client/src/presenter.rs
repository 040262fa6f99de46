use std::{collections::HashMap, sync::Arc};

use crate::{api::PostId, Comment};

#[derive(Clone, Debug)]
pub struct Presented {
    pub tree: Arc<[Comment]>,

    /// false if `tree` is the very snapshot that was presented last time
    pub changed: bool,
}

/// Remembers the last tree accepted for each post, so that re-fetches that
/// bring nothing new can be ignored by consumers
#[derive(Debug, Default)]
pub struct Presenter {
    last: HashMap<PostId, Arc<[Comment]>>,
}

impl Presenter {
    pub fn new() -> Presenter {
        Presenter::default()
    }

    pub fn present(&mut self, post: &PostId, tree: Vec<Comment>) -> Presented {
        if let Some(last) = self.last.get(post) {
            if last[..] == tree[..] {
                return Presented {
                    tree: last.clone(),
                    changed: false,
                };
            }
        }
        let tree: Arc<[Comment]> = Arc::from(tree);
        self.last.insert(post.clone(), tree.clone());
        Presented {
            tree,
            changed: true,
        }
    }

    pub fn snapshot(&self, post: &PostId) -> Option<Arc<[Comment]>> {
        self.last.get(post).cloned()
    }

    /// Drop the snapshot of a post whose view went away
    pub fn forget(&mut self, post: &PostId) {
        self.last.remove(post);
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        api::{CommentId, UserId},
        assemble,
        test_util::row,
    };

    fn tree() -> Vec<Comment> {
        let mut top = row("A", None, 3);
        top.like_count = 3;
        let mut reply = row("r1", Some("A"), 4);
        reply.user_id = Some(UserId::from("u1"));
        assemble(
            &PostId::from("post"),
            vec![top, row("B", None, 2)],
            vec![reply],
            &HashSet::new(),
        )
    }

    #[test]
    fn first_presentation_is_a_change() {
        let mut p = Presenter::new();
        let post = PostId::from("post");
        assert!(p.snapshot(&post).is_none());
        let res = p.present(&post, tree());
        assert!(res.changed);
        assert!(Arc::ptr_eq(&res.tree, &p.snapshot(&post).unwrap()));
    }

    #[test]
    fn identical_tree_keeps_previous_snapshot() {
        let mut p = Presenter::new();
        let post = PostId::from("post");
        let first = p.present(&post, tree());
        let second = p.present(&post, tree());
        assert!(!second.changed);
        assert!(Arc::ptr_eq(&first.tree, &second.tree));
    }

    #[test]
    fn any_field_difference_is_a_change() {
        let mutations: Vec<Box<dyn Fn(&mut Vec<Comment>)>> = vec![
            Box::new(|t: &mut Vec<Comment>| t[0].like_count = 4),
            Box::new(|t: &mut Vec<Comment>| t[0].liked_by_current_viewer = true),
            Box::new(|t: &mut Vec<Comment>| t[0].content.push('!')),
            Box::new(|t: &mut Vec<Comment>| t[0].updated_at = Some(t[0].created_at)),
            Box::new(|t: &mut Vec<Comment>| t[0].replies[0].author.display_name = String::from("bob")),
            Box::new(|t: &mut Vec<Comment>| t[0].replies[0].author.avatar_url = Some(String::from("x"))),
            Box::new(|t: &mut Vec<Comment>| t[0].replies[0].like_count += 1),
            Box::new(|t: &mut Vec<Comment>| t[0].replies.clear()),
            Box::new(|t: &mut Vec<Comment>| t.swap(0, 1)),
            Box::new(|t: &mut Vec<Comment>| t[1].id = CommentId::from("C")),
            Box::new(|t: &mut Vec<Comment>| {
                t.pop();
            }),
        ];
        let post = PostId::from("post");
        for (i, mutate) in mutations.iter().enumerate() {
            let mut p = Presenter::new();
            let first = p.present(&post, tree());
            let mut changed = tree();
            mutate(&mut changed);
            let second = p.present(&post, changed.clone());
            assert!(second.changed, "mutation {i} went unnoticed");
            assert!(!Arc::ptr_eq(&first.tree, &second.tree));
            assert_eq!(&second.tree[..], &changed[..]);
            // the new snapshot replaced the old one
            assert!(!p.present(&post, changed).changed);
        }
    }

    #[test]
    fn posts_are_tracked_separately() {
        let mut p = Presenter::new();
        let a = PostId::from("a");
        let b = PostId::from("b");
        assert!(p.present(&a, tree()).changed);
        assert!(p.present(&b, tree()).changed);
        assert!(!p.present(&a, tree()).changed);

        p.forget(&a);
        assert!(p.snapshot(&a).is_none());
        assert!(p.present(&a, tree()).changed);
        assert!(!p.present(&b, tree()).changed);

        p.clear();
        assert!(p.present(&b, tree()).changed);
    }

    #[test]
    fn empty_tree_is_presented_once() {
        let mut p = Presenter::new();
        let post = PostId::from("post");
        assert!(p.present(&post, Vec::new()).changed);
        assert!(!p.present(&post, Vec::new()).changed);
    }

    #[test]
    fn structurally_equal_trees_never_change() {
        bolero::check!()
            .with_type::<Vec<(u8, bool)>>()
            .for_each(|spec| {
                let build = || {
                    let top = spec
                        .iter()
                        .enumerate()
                        .map(|(i, (likes, liked))| {
                            let mut r = row(&format!("c{i}"), None, 1000 - i as i64);
                            r.like_count = u32::from(*likes);
                            r.guest_nickname = liked.then(|| String::from("nick"));
                            r
                        })
                        .collect::<Vec<_>>();
                    assemble(&PostId::from("post"), top, Vec::new(), &HashSet::new())
                };
                let mut p = Presenter::new();
                let first = p.present(&PostId::from("post"), build());
                let second = p.present(&PostId::from("post"), build());
                assert!(first.changed);
                assert!(!second.changed);
                assert!(Arc::ptr_eq(&first.tree, &second.tree));
            });
    }
}
