use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use agora_client::{
    api::{Authorship, CommentId, Gateway, NewComment, PostId, UserId, ViewerId},
    CommentFeed, Presented, Refresh,
};
use agora_mock_server::{Fixture, MockServer};
use anyhow::{anyhow, Context};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON fixture to use instead of the database at DATABASE_URL
    #[structopt(short, long, parse(from_os_str))]
    fixture: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, structopt::StructOpt)]
enum Command {
    /// Print the comment tree of a post
    Show {
        post: String,

        /// User id or guest token to compute likes for
        #[structopt(long)]
        viewer: Option<String>,
    },

    /// Comment on a post, or reply to one of its comments
    Comment {
        post: String,

        content: String,

        #[structopt(long)]
        parent: Option<String>,

        /// Post as this user instead of as a guest
        #[structopt(long, conflicts_with = "nickname")]
        user: Option<String>,

        /// Guest nickname
        #[structopt(long)]
        nickname: Option<String>,
    },

    /// Like or unlike a comment
    Like {
        post: String,

        comment: String,

        #[structopt(long)]
        viewer: String,

        #[structopt(long)]
        unlike: bool,
    },
}

impl Command {
    fn is_write(&self) -> bool {
        !matches!(self, Command::Show { .. })
    }
}

fn load_fixture(path: &Path) -> anyhow::Result<Fixture> {
    let data = fs::read(path).with_context(|| format!("reading fixture {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing fixture {:?}", path))
}

fn save_fixture(path: &Path, f: &Fixture) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(f).context("serializing fixture")?;
    fs::write(path, data).with_context(|| format!("writing fixture {:?}", path))
}

fn print_tree(out: &mut impl Write, presented: &Presented) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &*presented.tree).context("serializing comments")?;
    writeln!(out).context("writing output")
}

fn presented(r: Refresh) -> anyhow::Result<Presented> {
    r.presented()
        .ok_or_else(|| anyhow!("comment refresh was superseded by another one"))
}

async fn run<G: Gateway>(
    feed: &CommentFeed<G>,
    cmd: Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match cmd {
        Command::Show { post, viewer } => {
            let post = PostId(post);
            let viewer = viewer.map(ViewerId);
            let res = feed
                .refresh(&post, viewer.as_ref())
                .await
                .with_context(|| format!("fetching comments of post {post}"))?;
            print_tree(out, &presented(res)?)?;
        }
        Command::Comment {
            post,
            content,
            parent,
            user,
            nickname,
        } => {
            let authorship = match user {
                Some(u) => Authorship::User(UserId(u)),
                None => Authorship::Guest { nickname },
            };
            let viewer = authorship_viewer(&authorship);
            let comment = NewComment::new(PostId(post), parent.map(CommentId), content, authorship);
            let (id, res) = feed
                .post_comment(comment, viewer.as_ref())
                .await
                .context("posting comment")?;
            tracing::info!(comment = %id, "comment posted");
            print_tree(out, &presented(res)?)?;
        }
        Command::Like {
            post,
            comment,
            viewer,
            unlike,
        } => {
            let res = feed
                .set_like(
                    &PostId(post),
                    &ViewerId(viewer),
                    &CommentId(comment),
                    !unlike,
                )
                .await
                .context("setting like")?;
            print_tree(out, &presented(res)?)?;
        }
    }
    Ok(())
}

fn authorship_viewer(a: &Authorship) -> Option<ViewerId> {
    match a {
        Authorship::User(u) => Some(ViewerId::from(u.clone())),
        Authorship::Guest { .. } => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let mut out = io::stdout().lock();

    match opt.fixture {
        Some(path) => {
            let feed = CommentFeed::new(MockServer::from_fixture(load_fixture(&path)?));
            let is_write = opt.cmd.is_write();
            run(&feed, opt.cmd, &mut out).await?;
            if is_write {
                save_fixture(&path, &feed.gateway().to_fixture())?;
            }
        }
        None => {
            let db_url =
                std::env::var("DATABASE_URL").context("retrieving DATABASE_URL environment variable")?;
            let gateway = agora_pg::PgGateway::connect(&db_url).await?;
            run(&CommentFeed::new(gateway), opt.cmd, &mut out).await?;
        }
    }

    Ok(())
}
